//! Map correlator errors onto HTTP responses.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::warn;

use incident_correlator::types::ErrorOutput;
use incident_correlator::EngineError;

#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
  fn from(e: EngineError) -> Self {
    Self(e)
  }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      EngineError::Validation { .. } => StatusCode::BAD_REQUEST,
      EngineError::AllSourcesFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
      EngineError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
      EngineError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      warn!(%status, error = %self.0, "request failed");
    }
    (status, Json(ErrorOutput::from(&self.0))).into_response()
  }
}
