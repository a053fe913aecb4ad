//! Reliability Studio incident correlator.
//!
//! Given a service name, queries metrics, logs, traces and pod state
//! concurrently, normalizes each payload into typed events, merges them into
//! one timeline, computes impact and classifies severity.
//!
//! Degraded sources are recorded on the incident, not fatal. No DB; every
//! incident is recomputed on request.

pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod impact;
pub mod normalize;
pub mod severity;
pub mod slo;
pub mod sources;
pub mod time;
pub mod timeline;
pub mod types;

pub use config::Config;
pub use engine::Assembler;
pub use error::{EngineError, ParseError, SourceError, TransportError};
pub use sources::{HttpSource, SourceClient, Sources, StaticSource};
pub use types::{Event, Impact, Incident, Severity, SloStatus, Source};
