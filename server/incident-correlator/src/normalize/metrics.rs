//! Prometheus query responses -> a single sample.
//!
//! Error rate and tail latency come from two different queries; this
//! normalizer handles one metric family at a time and the assembler combines
//! the two samples into a `MetricResult`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ParseError;
use crate::time;

#[derive(Debug, Deserialize)]
struct PromResponse {
  status: String,
  #[serde(default)]
  data: Option<PromData>,
  #[serde(default)]
  error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromData {
  result: PromResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromResult {
  /// `vector` and `matrix` result types.
  Series(Vec<PromSeries>),
  /// `scalar` result type: a bare `[ts, "value"]` pair.
  Scalar((f64, String)),
}

#[derive(Debug, Deserialize)]
struct PromSeries {
  #[serde(default)]
  value: Option<(f64, String)>,
  #[serde(default)]
  values: Vec<(f64, String)>,
}

/// The sample a query resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
  pub at: DateTime<Utc>,
  pub value: f64,
}

/// Take the first series' last sample.
///
/// Returns `Ok(None)` for an empty result (nothing matched). Non-finite values
/// such as the `NaN` Prometheus yields for a 0/0 ratio become 0.
pub fn normalize_metric(payload: &[u8]) -> Result<Option<MetricSample>, ParseError> {
  let parsed: PromResponse = serde_json::from_slice(payload)?;
  if parsed.status != "success" {
    return Err(ParseError::new(format!(
      "prometheus status {}: {}",
      parsed.status,
      parsed.error.unwrap_or_default()
    )));
  }
  let data = parsed
    .data
    .ok_or_else(|| ParseError::new("prometheus response has no data"))?;

  let pair = match data.result {
    PromResult::Scalar(pair) => pair,
    PromResult::Series(series) => {
      let Some(first) = series.into_iter().next() else {
        return Ok(None);
      };
      match first.values.into_iter().last().or(first.value) {
        Some(pair) => pair,
        None => return Err(ParseError::new("series has neither value nor values")),
      }
    }
  };

  let (ts, raw) = pair;
  let at = time::from_unix_seconds(ts)
    .ok_or_else(|| ParseError::new(format!("sample timestamp {} out of range", ts)))?;
  let value: f64 = raw
    .trim()
    .parse()
    .map_err(|_| ParseError::new(format!("sample value {:?} is not numeric", raw)))?;

  Ok(Some(MetricSample {
    at,
    value: if value.is_finite() { value } else { 0.0 },
  }))
}
