//! Loki range-query responses -> LogResult.

use serde::Deserialize;

use crate::error::ParseError;
use crate::time;
use crate::types::{Event, LogResult, Source};

/// Case-insensitive marker that flags a line as an error.
const ERROR_MARKER: &str = "error";

#[derive(Debug, Deserialize)]
struct LokiResponse {
  #[serde(default)]
  status: Option<String>,
  data: LokiData,
}

#[derive(Debug, Deserialize)]
struct LokiData {
  result: Vec<LokiStream>,
}

#[derive(Debug, Deserialize)]
struct LokiStream {
  /// `[timestamp_nanos, line]` pairs.
  values: Vec<(String, String)>,
}

/// Parse a Loki `query_range` streams payload.
///
/// Every line becomes an event. Lines containing "error" (any case) are
/// counted; the first one in payload order is the root-cause candidate.
pub fn normalize_logs(payload: &[u8]) -> Result<LogResult, ParseError> {
  let parsed: LokiResponse = serde_json::from_slice(payload)?;
  if let Some(status) = parsed.status.as_deref() {
    if status != "success" {
      return Err(ParseError::new(format!("loki status {}", status)));
    }
  }

  let mut result = LogResult::default();
  for stream in parsed.data.result {
    for (ts, line) in stream.values {
      let time = time::parse_nanos_or_rfc3339(&ts)
        .ok_or_else(|| ParseError::new(format!("log timestamp {:?} is not unix nanos or RFC3339", ts)))?;

      if is_error_line(&line) {
        result.error_count += 1;
        if result.root_cause_candidate.is_none() {
          result.root_cause_candidate = Some(line.clone());
        }
      }
      result.events.push(Event::new(time, Source::Logs, line));
    }
  }
  Ok(result)
}

fn is_error_line(line: &str) -> bool {
  line.to_ascii_lowercase().contains(ERROR_MARKER)
}
