//! Kubernetes pod lists -> ClusterResult.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::time;
use crate::types::{ClusterResult, Event, Source};

const FAILED_PHASE: &str = "Failed";

#[derive(Debug, Deserialize)]
struct PodList {
  items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
  #[serde(default)]
  metadata: PodMetadata,
  #[serde(default)]
  status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodMetadata {
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  creation_timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
  #[serde(default)]
  phase: Option<String>,
  #[serde(default)]
  start_time: Option<String>,
  #[serde(default)]
  reason: Option<String>,
}

/// Count failed pods. A missing or unknown phase is healthy.
///
/// A failed pod without `startTime` falls back to its creation timestamp. With
/// neither, or with one that does not parse, it is counted but adds no
/// timeline event.
pub fn normalize_cluster(payload: &[u8]) -> Result<ClusterResult, ParseError> {
  let parsed: PodList = serde_json::from_slice(payload)?;

  let mut result = ClusterResult::default();
  for pod in parsed.items {
    if pod.status.phase.as_deref() != Some(FAILED_PHASE) {
      continue;
    }
    result.failing_pod_count += 1;

    let name = pod.metadata.name.as_deref().unwrap_or("<unnamed>");
    let Some(raw_ts) = pod
      .status
      .start_time
      .as_deref()
      .or(pod.metadata.creation_timestamp.as_deref())
    else {
      debug!(pod = name, "failed pod has no timestamp, no timeline event");
      continue;
    };
    let Some(time) = time::parse_rfc3339(raw_ts) else {
      warn!(pod = name, timestamp = raw_ts, "failed pod timestamp is not RFC3339, no timeline event");
      continue;
    };

    let message = match &pod.status.reason {
      Some(reason) => format!("pod {} failed: {}", name, reason),
      None => format!("pod {} failed", name),
    };
    result.events.push(Event::new(time, Source::Cluster, message));
  }
  Ok(result)
}
