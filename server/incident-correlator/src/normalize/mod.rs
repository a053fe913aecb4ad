//! Normalize raw backend payloads into typed, source-tagged results.
//!
//! Each normalizer decodes into explicit serde structs; a payload of the wrong
//! shape is a `ParseError`, never a panic.

pub mod cluster;
pub mod logs;
pub mod metrics;
pub mod traces;

pub use cluster::normalize_cluster;
pub use logs::normalize_logs;
pub use metrics::{normalize_metric, MetricSample};
pub use traces::normalize_traces;
