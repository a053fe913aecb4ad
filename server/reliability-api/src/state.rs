//! Shared handler state.

use incident_correlator::Assembler;

pub struct AppState {
  pub assembler: Assembler,
}
