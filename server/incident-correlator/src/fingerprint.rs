//! Stable content digest for incidents.

use crate::types::{DegradedSource, Event, Impact, Severity};

/// Compute a stable digest over the parts of an incident that describe the
/// situation (not the id, which only depends on the service).
///
/// Two assemblies over identical backend data yield the same digest, so a
/// caller polling a service can tell "nothing changed" without a deep diff.
pub fn digest(
  service: &str,
  root_cause: &str,
  severity: Severity,
  impact: &Impact,
  timeline: &[Event],
  degraded: &[DegradedSource],
) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(service.as_bytes());
  hasher.update(b"|");
  hasher.update(root_cause.as_bytes());
  hasher.update(b"|");
  hasher.update(severity.as_str().as_bytes());
  hasher.update(b"|");
  hasher.update(&impact.error_rate_percent.to_bits().to_le_bytes());
  hasher.update(&impact.failing_pod_count.to_le_bytes());
  hasher.update(&[u8::from(impact.slo_breached)]);

  for event in timeline {
    hasher.update(b"|");
    hasher.update(event.source.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(event.time.to_rfc3339().as_bytes());
    hasher.update(b":");
    hasher.update(event.message.as_bytes());
  }
  for d in degraded {
    hasher.update(b"|!");
    hasher.update(d.source.as_str().as_bytes());
  }

  // First 16 bytes (32 hex chars): compact, still collision-resistant.
  let hex = hasher.finalize().to_hex();
  hex[..32].to_string()
}
