//! Reliability Studio HTTP API
//!
//! Thin JSON surface over the incident correlator. Binds to 127.0.0.1 by
//! default (internal only).

mod error;
mod handlers;
mod state;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use handlers::{health, incident, slo};
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/incidents/:service", get(incident))
    .route("/api/slo/:service", get(slo))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
