//! Binary entrypoint: assemble one incident and write it to stdout as JSON.
//!
//! Output is either the Incident or an ErrorOutput line (with a non-zero exit
//! code). Logs go to stderr so stdout stays machine-readable.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use incident_correlator::types::ErrorOutput;
use incident_correlator::{Assembler, Config};

#[derive(Parser)]
#[command(
  name = "incident-correlator",
  about = "Correlate metrics, logs, traces and pod state into one incident",
  version
)]
struct Cli {
  /// Service to build the incident for
  service: String,

  /// TOML configuration file (RELIABILITY_* env vars override it)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Per-source timeout in milliseconds
  #[arg(long)]
  timeout_ms: Option<u64>,

  /// Pretty-print the JSON output
  #[arg(long)]
  pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  let code = match run(&cli).await {
    Ok(incident) => {
      let written = if cli.pretty {
        serde_json::to_writer_pretty(&mut out, &incident)
      } else {
        serde_json::to_writer(&mut out, &incident)
      };
      if let Err(e) = written {
        let _ = writeln!(io::stderr(), "incident-correlator: write error: {}", e);
        return ExitCode::FAILURE;
      }
      ExitCode::SUCCESS
    }
    Err(e) => {
      let err = match e.downcast_ref::<incident_correlator::EngineError>() {
        Some(engine_err) => ErrorOutput::from(engine_err),
        None => ErrorOutput::new(e.to_string()),
      };
      let _ = serde_json::to_writer(&mut out, &err);
      ExitCode::FAILURE
    }
  };

  let _ = writeln!(out);
  let _ = out.flush();
  code
}

async fn run(cli: &Cli) -> Result<incident_correlator::Incident> {
  let mut config = match &cli.config {
    Some(path) => Config::load(path)?,
    None => Config::default(),
  }
  .apply_env()?;
  if let Some(ms) = cli.timeout_ms {
    config.source_timeout_ms = ms;
  }

  let assembler = Assembler::from_config(config)?;
  Ok(assembler.assemble(&cli.service).await?)
}
