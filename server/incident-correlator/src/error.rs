//! Structured error types for the incident correlator.

use serde::Serialize;
use thiserror::Error;

use crate::types::{DegradedSource, Source};

/// A source client could not reach its backend, or the backend answered with
/// a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  #[error("connect: {0}")]
  Connect(String),

  #[error("backend returned HTTP {status}")]
  Status { status: u16 },

  #[error("timed out after {after_ms}ms")]
  Timeout { after_ms: u64 },

  #[error("body: {0}")]
  Body(String),
}

/// A payload arrived but did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse: {0}")]
pub struct ParseError(pub String);

impl ParseError {
  pub fn new(msg: impl Into<String>) -> Self {
    Self(msg.into())
  }
}

impl From<serde_json::Error> for ParseError {
  fn from(e: serde_json::Error) -> Self {
    Self(e.to_string())
  }
}

/// Why a source was left out of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  Transport,
  Parse,
  Timeout,
  Panicked,
}

/// Failure of one source during assembly. Never fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error("task panicked: {0}")]
  Panicked(String),
}

impl SourceError {
  pub fn kind(&self) -> FailureKind {
    match self {
      Self::Transport(TransportError::Timeout { .. }) => FailureKind::Timeout,
      Self::Transport(_) => FailureKind::Transport,
      Self::Parse(_) => FailureKind::Parse,
      Self::Panicked(_) => FailureKind::Panicked,
    }
  }
}

/// Errors returned to callers of the correlator.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("configuration: {0}")]
  Configuration(String),

  #[error("all sources failed for service {service}")]
  AllSourcesFailed {
    service: String,
    failures: Vec<DegradedSource>,
  },

  #[error("{backend} unavailable: {error}")]
  SourceUnavailable { backend: Source, error: SourceError },
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn configuration(msg: impl Into<String>) -> Self {
    Self::Configuration(msg.into())
  }
}
