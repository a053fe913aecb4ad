//! Source clients: one query in, raw payload (or transport error) out.
//!
//! Clients do not retry and do not interpret the payload; that is the
//! normalizers' job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use crate::config::Config;
use crate::error::{EngineError, TransportError};

#[async_trait]
pub trait SourceClient: Send + Sync {
  /// Backend name for logging.
  fn name(&self) -> &'static str;

  /// Issue a single query and return the raw response body.
  async fn fetch(&self, query: &str) -> Result<Bytes, TransportError>;
}

/// One client per telemetry backend, shared across concurrent assemblies.
#[derive(Clone)]
pub struct Sources {
  pub metrics: Arc<dyn SourceClient>,
  pub logs: Arc<dyn SourceClient>,
  pub traces: Arc<dyn SourceClient>,
  pub cluster: Arc<dyn SourceClient>,
}

impl Sources {
  /// HTTP clients for every backend named in `config`.
  pub fn http(config: &Config) -> Result<Self, EngineError> {
    let timeout = config.source_timeout();
    Ok(Self {
      metrics: Arc::new(HttpSource::new(&config.prometheus_url, Backend::Prometheus, timeout)?),
      logs: Arc::new(HttpSource::new(
        &config.loki_url,
        Backend::Loki {
          lookback_minutes: config.log_lookback_minutes,
          limit: config.log_limit,
        },
        timeout,
      )?),
      traces: Arc::new(HttpSource::new(
        &config.tempo_url,
        Backend::Tempo {
          limit: config.trace_limit,
        },
        timeout,
      )?),
      cluster: Arc::new(HttpSource::new(
        &config.kubernetes_url,
        Backend::Kubernetes {
          namespace: config.kubernetes_namespace.clone(),
        },
        timeout,
      )?),
    })
  }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Request layout of each backend's query API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
  /// `GET /api/v1/query?query=…`
  Prometheus,
  /// `GET /loki/api/v1/query_range?query=…&start=…&end=…&limit=…`
  Loki { lookback_minutes: u32, limit: u32 },
  /// `GET /api/search?q=…&limit=…`
  Tempo { limit: u32 },
  /// `GET /api/v1/namespaces/{ns}/pods?labelSelector=…`
  Kubernetes { namespace: String },
}

impl Backend {
  fn name(&self) -> &'static str {
    match self {
      Self::Prometheus => "prometheus",
      Self::Loki { .. } => "loki",
      Self::Tempo { .. } => "tempo",
      Self::Kubernetes { .. } => "kubernetes",
    }
  }

  fn path(&self) -> String {
    match self {
      Self::Prometheus => "/api/v1/query".into(),
      Self::Loki { .. } => "/loki/api/v1/query_range".into(),
      Self::Tempo { .. } => "/api/search".into(),
      Self::Kubernetes { namespace } => format!("/api/v1/namespaces/{}/pods", namespace),
    }
  }

  fn params(&self, query: &str) -> Vec<(&'static str, String)> {
    match self {
      Self::Prometheus => vec![("query", query.to_string())],
      Self::Loki {
        lookback_minutes,
        limit,
      } => {
        let end = Utc::now();
        let start = end - chrono::Duration::minutes(i64::from(*lookback_minutes));
        vec![
          ("query", query.to_string()),
          ("start", nanos(start).to_string()),
          ("end", nanos(end).to_string()),
          ("limit", limit.to_string()),
          ("direction", "forward".to_string()),
        ]
      }
      Self::Tempo { limit } => vec![("q", query.to_string()), ("limit", limit.to_string())],
      Self::Kubernetes { .. } => vec![("labelSelector", query.to_string())],
    }
  }
}

fn nanos(t: chrono::DateTime<Utc>) -> i64 {
  t.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// reqwest-backed source client.
#[derive(Debug, Clone)]
pub struct HttpSource {
  client: reqwest::Client,
  base_url: String,
  backend: Backend,
  timeout: Duration,
}

impl HttpSource {
  pub fn new(base_url: &str, backend: Backend, timeout: Duration) -> Result<Self, EngineError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| EngineError::configuration(format!("{} client: {}", backend.name(), e)))?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      backend,
      timeout,
    })
  }

  pub fn url(&self) -> String {
    format!("{}{}", self.base_url, self.backend.path())
  }

  fn map_err(&self, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
      TransportError::Timeout {
        after_ms: self.timeout.as_millis() as u64,
      }
    } else if e.is_body() || e.is_decode() {
      TransportError::Body(e.to_string())
    } else {
      TransportError::Connect(e.to_string())
    }
  }
}

#[async_trait]
impl SourceClient for HttpSource {
  fn name(&self) -> &'static str {
    self.backend.name()
  }

  async fn fetch(&self, query: &str) -> Result<Bytes, TransportError> {
    let url = self.url();
    debug!(backend = self.name(), %url, query, "querying backend");

    let response = self
      .client
      .get(&url)
      .query(&self.backend.params(query))
      .send()
      .await
      .map_err(|e| self.map_err(e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::Status {
        status: status.as_u16(),
      });
    }
    response.bytes().await.map_err(|e| self.map_err(e))
  }
}

// ---------------------------------------------------------------------------
// Static (replay / tests)
// ---------------------------------------------------------------------------

/// Answers every query with canned responses, optionally after a delay.
///
/// Queries are matched against `with_response_for` needles in insertion order
/// (substring match); anything else gets the default response.
#[derive(Debug, Clone)]
pub struct StaticSource {
  default: Result<Bytes, TransportError>,
  by_query: Vec<(String, Result<Bytes, TransportError>)>,
  delay: Option<Duration>,
}

impl StaticSource {
  pub fn ok(payload: impl Into<Bytes>) -> Self {
    Self {
      default: Ok(payload.into()),
      by_query: Vec::new(),
      delay: None,
    }
  }

  pub fn failing(error: TransportError) -> Self {
    Self {
      default: Err(error),
      by_query: Vec::new(),
      delay: None,
    }
  }

  pub fn with_response_for(mut self, needle: impl Into<String>, payload: impl Into<Bytes>) -> Self {
    self.by_query.push((needle.into(), Ok(payload.into())));
    self
  }

  pub fn with_error_for(mut self, needle: impl Into<String>, error: TransportError) -> Self {
    self.by_query.push((needle.into(), Err(error)));
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }
}

#[async_trait]
impl SourceClient for StaticSource {
  fn name(&self) -> &'static str {
    "static"
  }

  async fn fetch(&self, query: &str) -> Result<Bytes, TransportError> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self
      .by_query
      .iter()
      .find(|(needle, _)| query.contains(needle.as_str()))
      .map(|(_, response)| response.clone())
      .unwrap_or_else(|| self.default.clone())
  }
}
