//! Timestamp decoding for the backends' native representations.

use chrono::{DateTime, Utc};

/// Parse a unix-nanosecond string ("1704067201000000000"), as Loki and Tempo
/// emit, falling back to RFC3339.
pub fn parse_nanos_or_rfc3339(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
    let nanos: i64 = s.parse().ok()?;
    return Some(DateTime::<Utc>::from_timestamp_nanos(nanos));
  }
  parse_rfc3339(s)
}

/// Parse an RFC3339 timestamp and normalize it to UTC.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s.trim())
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

/// Convert Prometheus' fractional unix seconds (1704067201.123) to UTC.
pub fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
  if !secs.is_finite() || secs < 0.0 {
    return None;
  }
  let whole = secs.trunc() as i64;
  let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
  DateTime::<Utc>::from_timestamp(whole, nanos.min(999_999_999))
}
