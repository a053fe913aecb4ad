//! HTTP handlers for the API.

use axum::{
  extract::{Path, State},
  Json,
};
use std::sync::Arc;

use incident_correlator::{Incident, SloStatus};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> &'static str {
  "ok"
}

pub async fn incident(
  State(state): State<Arc<AppState>>,
  Path(service): Path<String>,
) -> Result<Json<Incident>, ApiError> {
  let incident = state.assembler.assemble(&service).await?;
  Ok(Json(incident))
}

pub async fn slo(
  State(state): State<Arc<AppState>>,
  Path(service): Path<String>,
) -> Result<Json<SloStatus>, ApiError> {
  let status = state.assembler.slo_status(&service).await?;
  Ok(Json(status))
}
