//! Correlator configuration with sane defaults.
//!
//! Layering: compiled-in defaults, then an optional TOML file, then
//! `RELIABILITY_*` environment variables.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;
use crate::impact::SLO_ERROR_RATE_THRESHOLD_PERCENT;

/// Placeholder substituted with the service name in query templates.
pub const SERVICE_PLACEHOLDER: &str = "{service}";

/// Backend endpoints, timeouts and policy thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub prometheus_url: String,
  pub loki_url: String,
  pub tempo_url: String,
  /// Kubernetes API base; the default expects `kubectl proxy`.
  pub kubernetes_url: String,
  pub kubernetes_namespace: String,
  /// Per-source budget for the whole fetch + normalize step.
  pub source_timeout_ms: u64,
  /// Error-rate percentage above which the SLO counts as breached.
  pub slo_error_rate_threshold_percent: f64,
  /// Availability objective used for error-budget reporting.
  pub slo_objective_percent: f64,
  /// How far back the log range query reaches.
  pub log_lookback_minutes: u32,
  pub log_limit: u32,
  pub trace_limit: u32,
  pub queries: QueryTemplates,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      prometheus_url: "http://localhost:9090".into(),
      loki_url: "http://localhost:3100".into(),
      tempo_url: "http://localhost:3200".into(),
      kubernetes_url: "http://localhost:8001".into(),
      kubernetes_namespace: "default".into(),
      source_timeout_ms: 3000,
      slo_error_rate_threshold_percent: SLO_ERROR_RATE_THRESHOLD_PERCENT,
      slo_objective_percent: 99.0,
      log_lookback_minutes: 15,
      log_limit: 500,
      trace_limit: 100,
      queries: QueryTemplates::default(),
    }
  }
}

/// Per-backend query strings. `{service}` is replaced with the service name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryTemplates {
  /// Must evaluate to a percentage (0..=100).
  pub error_rate: String,
  /// Must evaluate to milliseconds.
  pub tail_latency: String,
  pub logs: String,
  pub traces: String,
  /// Kubernetes label selector.
  pub pods: String,
}

impl Default for QueryTemplates {
  fn default() -> Self {
    Self {
      error_rate: concat!(
        "100 * sum(rate(http_requests_total{service=\"{service}\",status=~\"5..\"}[5m]))",
        " / sum(rate(http_requests_total{service=\"{service}\"}[5m]))"
      )
      .into(),
      tail_latency: concat!(
        "1000 * histogram_quantile(0.99, ",
        "sum(rate(http_request_duration_seconds_bucket{service=\"{service}\"}[5m])) by (le))"
      )
      .into(),
      logs: "{app=\"{service}\"}".into(),
      traces: "{ resource.service.name = \"{service}\" }".into(),
      pods: "app={service}".into(),
    }
  }
}

impl QueryTemplates {
  pub fn render(template: &str, service: &str) -> String {
    template.replace(SERVICE_PLACEHOLDER, service)
  }
}

impl Config {
  /// Load configuration from a TOML file. Missing keys keep their defaults.
  pub fn load(path: &Path) -> Result<Self, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
      EngineError::configuration(format!("read {}: {}", path.display(), e))
    })?;
    let config: Self = toml::from_str(&content).map_err(|e| {
      EngineError::configuration(format!("parse {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), "loaded correlator configuration");
    Ok(config)
  }

  /// Overlay `RELIABILITY_*` environment variables.
  pub fn apply_env(self) -> Result<Self, EngineError> {
    self.apply_env_with(|key| std::env::var(key).ok())
  }

  pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, EngineError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(v) = lookup("RELIABILITY_PROMETHEUS_URL") {
      self.prometheus_url = v;
    }
    if let Some(v) = lookup("RELIABILITY_LOKI_URL") {
      self.loki_url = v;
    }
    if let Some(v) = lookup("RELIABILITY_TEMPO_URL") {
      self.tempo_url = v;
    }
    if let Some(v) = lookup("RELIABILITY_KUBERNETES_URL") {
      self.kubernetes_url = v;
    }
    if let Some(v) = lookup("RELIABILITY_KUBERNETES_NAMESPACE") {
      self.kubernetes_namespace = v;
    }
    if let Some(v) = lookup("RELIABILITY_SOURCE_TIMEOUT_MS") {
      self.source_timeout_ms = v.parse().map_err(|_| {
        EngineError::configuration(format!("RELIABILITY_SOURCE_TIMEOUT_MS: {:?} is not an integer", v))
      })?;
    }
    if let Some(v) = lookup("RELIABILITY_SLO_THRESHOLD_PERCENT") {
      self.slo_error_rate_threshold_percent = v.parse().map_err(|_| {
        EngineError::configuration(format!("RELIABILITY_SLO_THRESHOLD_PERCENT: {:?} is not a number", v))
      })?;
    }
    Ok(self)
  }

  /// Reject configurations that can never work. Called once at construction.
  pub fn validate(&self) -> Result<(), EngineError> {
    for (name, url) in [
      ("prometheus_url", &self.prometheus_url),
      ("loki_url", &self.loki_url),
      ("tempo_url", &self.tempo_url),
      ("kubernetes_url", &self.kubernetes_url),
    ] {
      let parsed = Url::parse(url)
        .map_err(|e| EngineError::configuration(format!("{}: {:?}: {}", name, url, e)))?;
      if !matches!(parsed.scheme(), "http" | "https") {
        return Err(EngineError::configuration(format!(
          "{}: scheme must be http or https, got {}",
          name,
          parsed.scheme()
        )));
      }
    }
    if self.kubernetes_namespace.trim().is_empty() {
      return Err(EngineError::configuration("kubernetes_namespace must not be empty"));
    }
    if self.source_timeout_ms == 0 {
      return Err(EngineError::configuration("source_timeout_ms must be > 0"));
    }
    if !self.slo_error_rate_threshold_percent.is_finite() || self.slo_error_rate_threshold_percent < 0.0 {
      return Err(EngineError::configuration(
        "slo_error_rate_threshold_percent must be a non-negative number",
      ));
    }
    if !(self.slo_objective_percent > 0.0 && self.slo_objective_percent <= 100.0) {
      return Err(EngineError::configuration("slo_objective_percent must be in (0, 100]"));
    }
    Ok(())
  }

  pub fn source_timeout(&self) -> Duration {
    Duration::from_millis(self.source_timeout_ms)
  }
}
