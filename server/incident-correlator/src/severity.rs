//! Severity classification. Pure and total over `Impact`.

use crate::types::{Impact, Severity};

/// More failing pods than this is critical regardless of error rate.
pub const CRITICAL_FAILING_POD_COUNT: u64 = 3;
pub const CRITICAL_ERROR_RATE_PERCENT: f64 = 5.0;
pub const WARNING_ERROR_RATE_PERCENT: f64 = 1.0;

/// Critical is checked first so high error rate plus many failing pods is
/// never reported as a warning.
pub fn classify(impact: &Impact) -> Severity {
  if impact.failing_pod_count > CRITICAL_FAILING_POD_COUNT
    || impact.error_rate_percent > CRITICAL_ERROR_RATE_PERCENT
  {
    Severity::Critical
  } else if impact.error_rate_percent > WARNING_ERROR_RATE_PERCENT {
    Severity::Warning
  } else {
    Severity::Healthy
  }
}
