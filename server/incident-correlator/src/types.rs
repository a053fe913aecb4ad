//! Core types for the correlator (normalized results + output contract).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FailureKind;

// ---------------------------------------------------------------------------
// Source tag
// ---------------------------------------------------------------------------

/// Telemetry backend an event came from.
///
/// Variant order is the timeline tie-break priority: among events with equal
/// timestamps, logs sort first and metrics last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Logs,
  Traces,
  Cluster,
  Metrics,
}

impl Source {
  pub const ALL: [Source; 4] = [Self::Logs, Self::Traces, Self::Cluster, Self::Metrics];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Logs => "logs",
      Self::Traces => "traces",
      Self::Cluster => "cluster",
      Self::Metrics => "metrics",
    }
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One normalized, source-tagged occurrence. Only normalizers construct these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
  pub time: DateTime<Utc>,
  pub source: Source,
  pub message: String,
}

impl Event {
  pub(crate) fn new(time: DateTime<Utc>, source: Source, message: impl Into<String>) -> Self {
    Self {
      time,
      source,
      message: message.into(),
    }
  }
}

// ---------------------------------------------------------------------------
// Normalized per-source results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogResult {
  pub events: Vec<Event>,
  pub error_count: u64,
  /// First error-marked line in payload order.
  pub root_cause_candidate: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricResult {
  /// Percentage of failed requests, 0..=100.
  pub error_rate: f64,
  pub tail_latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceResult {
  pub events: Vec<Event>,
  pub failure_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterResult {
  pub events: Vec<Event>,
  pub failing_pod_count: u64,
}

// ---------------------------------------------------------------------------
// Impact + severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Impact {
  pub slo_breached: bool,
  pub error_rate_percent: f64,
  pub failing_pod_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Healthy,
  Warning,
  Critical,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Healthy => "healthy",
      Self::Warning => "warning",
      Self::Critical => "critical",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Output types (what callers serialize)
// ---------------------------------------------------------------------------

/// A source left out of an incident, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedSource {
  pub source: Source,
  pub kind: FailureKind,
  pub reason: String,
}

/// Derived scalars that do not feed `Impact` but are worth reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalSummary {
  pub log_error_count: u64,
  pub trace_failure_count: u64,
  pub tail_latency_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Incident {
  pub id: String,
  pub service: String,
  pub root_cause: String,
  pub severity: Severity,
  pub timeline: Vec<Event>,
  pub impact: Impact,
  pub signals: SignalSummary,
  /// True when at least one source was degraded.
  pub partial: bool,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub degraded_sources: Vec<DegradedSource>,
  pub digest: String,
}

impl Incident {
  pub fn is_degraded(&self, source: Source) -> bool {
    self.degraded_sources.iter().any(|d| d.source == source)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SloState {
  Healthy,
  Degraded,
}

/// Error-budget view of a service's error rate.
#[derive(Debug, Clone, Serialize)]
pub struct SloStatus {
  pub service: String,
  /// Availability objective in percent, e.g. 99.0.
  pub objective: f64,
  /// Allowed error rate in percent (100 - objective).
  pub error_budget: f64,
  pub burn_rate: f64,
  pub error_rate_percent: f64,
  pub status: SloState,
}

// ---------------------------------------------------------------------------
// CLI / HTTP error wrapper
// ---------------------------------------------------------------------------

/// Structured error output for failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

impl From<&crate::error::EngineError> for ErrorOutput {
  fn from(e: &crate::error::EngineError) -> Self {
    match e {
      crate::error::EngineError::Validation { field, reason } => {
        ErrorOutput::new(reason.clone()).with_field(field.clone())
      }
      _ => ErrorOutput::new(e.to_string()),
    }
  }
}
