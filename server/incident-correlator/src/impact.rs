//! Blast-radius figures from the metrics and cluster results.

use crate::types::{ClusterResult, Impact, MetricResult};

/// Default error-rate percentage above which the SLO counts as breached.
pub const SLO_ERROR_RATE_THRESHOLD_PERCENT: f64 = 1.0;

/// A degraded source is passed as `None` and contributes zero.
pub fn calculate(
  metrics: Option<&MetricResult>,
  cluster: Option<&ClusterResult>,
  slo_threshold_percent: f64,
) -> Impact {
  let error_rate_percent = metrics.map(|m| m.error_rate).unwrap_or(0.0);
  let failing_pod_count = cluster.map(|c| c.failing_pod_count).unwrap_or(0);
  Impact {
    slo_breached: error_rate_percent > slo_threshold_percent,
    error_rate_percent,
    failing_pod_count,
  }
}
