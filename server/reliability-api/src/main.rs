//! Binary entrypoint for the reliability API.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use incident_correlator::{Assembler, Config};
use reliability_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
    )
    .init();

  let port: u16 = std::env::var("PORT")
    .unwrap_or_else(|_| "9000".into())
    .parse()
    .map_err(|e| anyhow::anyhow!("PORT must be a valid u16: {}", e))?;

  let config = match std::env::var("RELIABILITY_CONFIG") {
    Ok(path) => Config::load(Path::new(&path))?,
    Err(_) => Config::default(),
  }
  .apply_env()?;

  // Bad backend URLs are fatal here, never per request.
  let assembler = Assembler::from_config(config)?;
  let state = Arc::new(AppState { assembler });
  let app = reliability_api::router(state);

  let addr = SocketAddr::from(([127, 0, 0, 1], port));
  tracing::info!(%addr, "reliability-api listening");

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}
