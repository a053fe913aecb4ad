//! Incident assembler: fans out to every source, normalizes, correlates.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, QueryTemplates};
use crate::error::{EngineError, ParseError, SourceError, TransportError};
use crate::fingerprint;
use crate::impact;
use crate::normalize::{self, MetricSample};
use crate::severity;
use crate::slo;
use crate::sources::{SourceClient, Sources};
use crate::timeline;
use crate::types::*;

/// Longest accepted service name (a DNS-1123 subdomain).
const MAX_SERVICE_LEN: usize = 253;

/// Builds incidents on demand. Holds clients and configuration only; no
/// incident state survives between calls.
#[derive(Clone)]
pub struct Assembler {
  config: Arc<Config>,
  sources: Sources,
}

/// Both halves of the metrics source. Either query may fail on its own.
struct MetricOutcome {
  error_rate: Result<Option<MetricSample>, SourceError>,
  tail_latency: Result<Option<MetricSample>, SourceError>,
}

impl Assembler {
  pub fn new(config: Config, sources: Sources) -> Self {
    Self {
      config: Arc::new(config),
      sources,
    }
  }

  /// Validate `config` and build HTTP clients for every backend.
  pub fn from_config(config: Config) -> Result<Self, EngineError> {
    config.validate()?;
    let sources = Sources::http(&config)?;
    Ok(Self::new(config, sources))
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Assemble one incident for `service`.
  ///
  /// Sources that fail, time out, or return malformed payloads are recorded in
  /// `degraded_sources` and contribute nothing. Only when every source fails
  /// is the call itself an error.
  #[instrument(skip(self), fields(timeout_ms = self.config.source_timeout_ms))]
  pub async fn assemble(&self, service: &str) -> Result<Incident, EngineError> {
    validate_service(service)?;
    let queries = &self.config.queries;
    let timeout = self.config.source_timeout();

    // Fan out: one task per source, each with its own deadline.
    let metrics_task = spawn_with_timeout(
      timeout,
      fetch_metrics(
        self.sources.metrics.clone(),
        QueryTemplates::render(&queries.error_rate, service),
        QueryTemplates::render(&queries.tail_latency, service),
      ),
    );
    let logs_task = spawn_with_timeout(
      timeout,
      fetch_normalized(
        self.sources.logs.clone(),
        QueryTemplates::render(&queries.logs, service),
        normalize::normalize_logs,
      ),
    );
    let traces_task = spawn_with_timeout(
      timeout,
      fetch_normalized(
        self.sources.traces.clone(),
        QueryTemplates::render(&queries.traces, service),
        normalize::normalize_traces,
      ),
    );
    let cluster_task = spawn_with_timeout(
      timeout,
      fetch_normalized(
        self.sources.cluster.clone(),
        QueryTemplates::render(&queries.pods, service),
        normalize::normalize_cluster,
      ),
    );

    let (metrics, logs, traces, cluster) = tokio::join!(
      join(metrics_task),
      join(logs_task),
      join(traces_task),
      join(cluster_task)
    );

    let mut degraded: Vec<DegradedSource> = Vec::new();
    let metrics = settle_metrics(metrics, &mut degraded);
    let logs = settle(Source::Logs, logs, &mut degraded);
    let traces = settle(Source::Traces, traces, &mut degraded);
    let cluster = settle(Source::Cluster, cluster, &mut degraded);

    for d in &degraded {
      warn!(service, source = %d.source, kind = ?d.kind, reason = %d.reason, "source degraded");
    }

    if metrics.is_none() && logs.is_none() && traces.is_none() && cluster.is_none() {
      return Err(EngineError::AllSourcesFailed {
        service: service.to_string(),
        failures: degraded,
      });
    }

    let impact = impact::calculate(
      metrics.as_ref(),
      cluster.as_ref(),
      self.config.slo_error_rate_threshold_percent,
    );
    let severity = severity::classify(&impact);

    let logs = logs.unwrap_or_default();
    let traces = traces.unwrap_or_default();
    let cluster = cluster.unwrap_or_default();
    let signals = SignalSummary {
      log_error_count: logs.error_count,
      trace_failure_count: traces.failure_count,
      tail_latency_ms: metrics.map(|m| m.tail_latency_ms).unwrap_or(0.0),
    };

    let candidate = logs.root_cause_candidate;
    let timeline = timeline::build([logs.events, traces.events, cluster.events]);
    let root_cause = resolve_root_cause(candidate, &timeline);

    let digest = fingerprint::digest(service, &root_cause, severity, &impact, &timeline, &degraded);

    info!(
      service,
      severity = %severity,
      error_rate = impact.error_rate_percent,
      failing_pods = impact.failing_pod_count,
      events = timeline.len(),
      degraded = degraded.len(),
      "incident assembled"
    );

    Ok(Incident {
      id: format!("{}-incident", service),
      service: service.to_string(),
      root_cause,
      severity,
      timeline,
      impact,
      signals,
      partial: !degraded.is_empty(),
      degraded_sources: degraded,
      digest,
    })
  }

  /// Error-budget status for `service`, from the error-rate query alone.
  #[instrument(skip(self))]
  pub async fn slo_status(&self, service: &str) -> Result<SloStatus, EngineError> {
    validate_service(service)?;
    let query = QueryTemplates::render(&self.config.queries.error_rate, service);
    let task = spawn_with_timeout(
      self.config.source_timeout(),
      fetch_normalized(self.sources.metrics.clone(), query, normalize::normalize_metric),
    );
    let sample = join(task).await.map_err(|error| EngineError::SourceUnavailable {
      backend: Source::Metrics,
      error,
    })?;

    Ok(slo::evaluate(
      service,
      sample.map(|s| clamp_percent(s.value)).unwrap_or(0.0),
      self.config.slo_objective_percent,
      self.config.slo_error_rate_threshold_percent,
    ))
  }
}

/// Service names end up inside backend queries; keep them to DNS-label-ish
/// characters so they cannot break out of a selector.
pub fn validate_service(service: &str) -> Result<(), EngineError> {
  if service.is_empty() {
    return Err(EngineError::validation("service", "must not be empty"));
  }
  if service.len() > MAX_SERVICE_LEN {
    return Err(EngineError::validation("service", "longer than 253 characters"));
  }
  if !service
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
  {
    return Err(EngineError::validation(
      "service",
      "only ASCII letters, digits, '-', '_' and '.' are allowed",
    ));
  }
  Ok(())
}

// ---------------------------------------------------------------------------
// Fan-out plumbing
// ---------------------------------------------------------------------------

/// Run `fut` on its own task; past `timeout` the future is dropped and the
/// source reported as timed out.
fn spawn_with_timeout<T, F>(timeout: Duration, fut: F) -> JoinHandle<Result<T, SourceError>>
where
  T: Send + 'static,
  F: Future<Output = Result<T, SourceError>> + Send + 'static,
{
  tokio::spawn(async move {
    match tokio::time::timeout(timeout, fut).await {
      Ok(result) => result,
      Err(_) => Err(
        TransportError::Timeout {
          after_ms: timeout.as_millis() as u64,
        }
        .into(),
      ),
    }
  })
}

async fn join<T>(handle: JoinHandle<Result<T, SourceError>>) -> Result<T, SourceError> {
  match handle.await {
    Ok(result) => result,
    Err(e) => Err(SourceError::Panicked(e.to_string())),
  }
}

async fn fetch_normalized<T>(
  client: Arc<dyn SourceClient>,
  query: String,
  normalize: fn(&[u8]) -> Result<T, ParseError>,
) -> Result<T, SourceError> {
  let payload = client.fetch(&query).await?;
  debug!(backend = client.name(), bytes = payload.len(), "payload received");
  Ok(normalize(&payload)?)
}

/// The two metric queries run concurrently inside the metrics task.
async fn fetch_metrics(
  client: Arc<dyn SourceClient>,
  error_rate_query: String,
  latency_query: String,
) -> Result<MetricOutcome, SourceError> {
  let (error_rate, tail_latency) = tokio::join!(
    fetch_normalized(client.clone(), error_rate_query, normalize::normalize_metric),
    fetch_normalized(client, latency_query, normalize::normalize_metric),
  );
  Ok(MetricOutcome {
    error_rate,
    tail_latency,
  })
}

// ---------------------------------------------------------------------------
// Settling results
// ---------------------------------------------------------------------------

fn degrade(source: Source, error: &SourceError) -> DegradedSource {
  DegradedSource {
    source,
    kind: error.kind(),
    reason: error.to_string(),
  }
}

fn settle<T>(source: Source, result: Result<T, SourceError>, degraded: &mut Vec<DegradedSource>) -> Option<T> {
  match result {
    Ok(value) => Some(value),
    Err(e) => {
      degraded.push(degrade(source, &e));
      None
    }
  }
}

/// Combine both metric samples. The source is degraded if either query failed
/// and unavailable only if both did.
fn settle_metrics(
  outcome: Result<MetricOutcome, SourceError>,
  degraded: &mut Vec<DegradedSource>,
) -> Option<MetricResult> {
  let outcome = settle(Source::Metrics, outcome, degraded)?;

  let mut failures: Vec<(&str, SourceError)> = Vec::new();
  let mut result = MetricResult::default();
  let mut any_ok = false;

  match outcome.error_rate {
    Ok(sample) => {
      any_ok = true;
      if let Some(s) = sample {
        debug!(at = %s.at, value = s.value, "error-rate sample");
        result.error_rate = clamp_percent(s.value);
      }
    }
    Err(e) => failures.push(("error-rate", e)),
  }
  match outcome.tail_latency {
    Ok(sample) => {
      any_ok = true;
      if let Some(s) = sample {
        debug!(at = %s.at, value = s.value, "tail-latency sample");
        result.tail_latency_ms = s.value.max(0.0);
      }
    }
    Err(e) => failures.push(("tail-latency", e)),
  }

  if let Some((_, first)) = failures.first() {
    let reason = failures
      .iter()
      .map(|(query, e)| format!("{} query: {}", query, e))
      .collect::<Vec<_>>()
      .join("; ");
    degraded.push(DegradedSource {
      source: Source::Metrics,
      kind: first.kind(),
      reason,
    });
  }

  any_ok.then_some(result)
}

fn clamp_percent(v: f64) -> f64 {
  v.clamp(0.0, 100.0)
}

/// Prefer the first error log line; otherwise the earliest trace or pod
/// failure, so the root cause is empty only when nothing reported an error.
fn resolve_root_cause(log_candidate: Option<String>, timeline: &[Event]) -> String {
  log_candidate
    .or_else(|| {
      timeline
        .iter()
        .find(|e| matches!(e.source, Source::Traces | Source::Cluster))
        .map(|e| e.message.clone())
    })
    .unwrap_or_default()
}
