//! Error-budget view of the error-rate signal.

use crate::types::{SloState, SloStatus};

/// Build the SLO status for a service.
///
/// `objective_percent` is the availability target (99.0 leaves a 1% error
/// budget). Burn rate is error rate over budget; with no budget it is 0.
pub fn evaluate(
  service: &str,
  error_rate_percent: f64,
  objective_percent: f64,
  threshold_percent: f64,
) -> SloStatus {
  let error_budget = (100.0 - objective_percent).max(0.0);
  let burn_rate = if error_budget > 0.0 {
    round3(error_rate_percent / error_budget)
  } else {
    0.0
  };
  let status = if error_rate_percent > threshold_percent {
    SloState::Degraded
  } else {
    SloState::Healthy
  };
  SloStatus {
    service: service.to_string(),
    objective: objective_percent,
    error_budget: round3(error_budget),
    burn_rate,
    error_rate_percent,
    status,
  }
}

fn round3(v: f64) -> f64 {
  (v * 1000.0).round() / 1000.0
}
