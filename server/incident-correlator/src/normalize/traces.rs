//! Tempo search responses -> TraceResult.

use serde::Deserialize;

use crate::error::ParseError;
use crate::time;
use crate::types::{Event, Source, TraceResult};

/// The only status that does not count as a failure.
const OK_STATUS: &str = "ok";

#[derive(Debug, Deserialize)]
struct TempoSearch {
  /// Tempo omits the key entirely when nothing matched.
  #[serde(default)]
  traces: Vec<TraceSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraceSummary {
  #[serde(default, rename = "traceID")]
  trace_id: Option<String>,
  #[serde(default)]
  root_service_name: Option<String>,
  #[serde(default)]
  root_trace_name: Option<String>,
  start_time_unix_nano: String,
  status: String,
}

pub fn normalize_traces(payload: &[u8]) -> Result<TraceResult, ParseError> {
  let parsed: TempoSearch = serde_json::from_slice(payload)?;

  let mut result = TraceResult::default();
  for trace in parsed.traces {
    if trace.status == OK_STATUS {
      continue;
    }
    let time = time::parse_nanos_or_rfc3339(&trace.start_time_unix_nano).ok_or_else(|| {
      ParseError::new(format!(
        "trace start time {:?} is not unix nanos",
        trace.start_time_unix_nano
      ))
    })?;
    result.failure_count += 1;
    result.events.push(Event::new(time, Source::Traces, describe(&trace)));
  }
  Ok(result)
}

fn describe(trace: &TraceSummary) -> String {
  let mut msg = format!("trace {} failed", trace.trace_id.as_deref().unwrap_or("<unknown>"));
  match (&trace.root_service_name, &trace.root_trace_name) {
    (Some(svc), Some(name)) => msg.push_str(&format!(" in {} {}", svc, name)),
    (Some(svc), None) => msg.push_str(&format!(" in {}", svc)),
    (None, Some(name)) => msg.push_str(&format!(" in {}", name)),
    (None, None) => {}
  }
  msg.push_str(&format!(" (status {})", trace.status));
  msg
}
