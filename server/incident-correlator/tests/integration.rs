//! Integration tests for the incident correlator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use incident_correlator::error::FailureKind;
use incident_correlator::timeline;
use incident_correlator::{
  Assembler, Config, EngineError, Severity, Source, SourceClient, Sources, StaticSource,
  TransportError,
};

fn prom(value: &str) -> String {
  format!(
    r#"{{"status":"success","data":{{"resultType":"vector","result":[{{"metric":{{"service":"checkout"}},"value":[1704067260,"{}"]}}]}}}}"#,
    value
  )
}

/// Error-rate and latency queries answered separately.
fn metrics(error_rate: &str, latency_ms: &str) -> StaticSource {
  StaticSource::ok(prom(latency_ms)).with_response_for("http_requests_total", prom(error_rate))
}

fn logs(lines: &[(&str, &str)]) -> StaticSource {
  let payload = serde_json::json!({
    "status": "success",
    "data": { "resultType": "streams", "result": [{ "stream": { "app": "checkout" }, "values": lines }] }
  });
  StaticSource::ok(payload.to_string())
}

fn traces(json: &str) -> StaticSource {
  StaticSource::ok(json.to_string())
}

fn pods(json: &str) -> StaticSource {
  StaticSource::ok(json.to_string())
}

fn assembler(metrics: StaticSource, logs: StaticSource, traces: StaticSource, cluster: StaticSource) -> Assembler {
  Assembler::new(
    Config::default(),
    Sources {
      metrics: Arc::new(metrics),
      logs: Arc::new(logs),
      traces: Arc::new(traces),
      cluster: Arc::new(cluster),
    },
  )
}

fn refused() -> StaticSource {
  StaticSource::failing(TransportError::Connect("connection refused".into()))
}

#[tokio::test]
async fn end_to_end_critical_incident() {
  let a = assembler(
    metrics("6.2", "850"),
    logs(&[("1704067202000000000", "2024-01-01T00:00:02Z error db timeout")]),
    traces(r#"{"traces":[{"traceID":"t1","startTimeUnixNano":"1704067201000000000","status":"ok"}]}"#),
    pods(r#"{"items":[{"metadata":{"name":"checkout-7f9"},"status":{"phase":"Failed"}}]}"#),
  );

  let incident = a.assemble("checkout").await.unwrap();

  assert_eq!(incident.id, "checkout-incident");
  assert_eq!(incident.service, "checkout");
  assert_eq!(incident.severity, Severity::Critical);
  assert!(incident.impact.slo_breached);
  assert_eq!(incident.impact.error_rate_percent, 6.2);
  assert_eq!(incident.impact.failing_pod_count, 1);
  assert_eq!(incident.timeline.len(), 1);
  assert_eq!(incident.timeline[0].source, Source::Logs);
  assert_eq!(incident.root_cause, "2024-01-01T00:00:02Z error db timeout");
  assert_eq!(incident.signals.log_error_count, 1);
  assert_eq!(incident.signals.trace_failure_count, 0);
  assert_eq!(incident.signals.tail_latency_ms, 850.0);
  assert!(!incident.partial);
  assert!(incident.degraded_sources.is_empty());
}

#[tokio::test]
async fn root_cause_is_first_error_line() {
  let a = assembler(
    metrics("0", "100"),
    logs(&[
      ("1704067201000000000", "2024-01-01T00:00:01Z info startup"),
      ("1704067202000000000", "2024-01-01T00:00:02Z error db timeout"),
    ]),
    traces(r#"{"traces":[]}"#),
    pods(r#"{"items":[]}"#),
  );

  let incident = a.assemble("checkout").await.unwrap();
  assert_eq!(incident.root_cause, "2024-01-01T00:00:02Z error db timeout");
  assert_eq!(incident.signals.log_error_count, 1);
  assert_eq!(incident.severity, Severity::Healthy);
}

#[tokio::test]
async fn timeline_is_sorted_across_sources() {
  let a = assembler(
    metrics("0.5", "100"),
    logs(&[
      ("1704067205000000000", "error: retry budget exhausted"),
      ("1704067201000000000", "info: request"),
    ]),
    traces(
      r#"{"traces":[
        {"traceID":"t1","startTimeUnixNano":"1704067203000000000","status":"error"},
        {"traceID":"t2","startTimeUnixNano":"1704067201000000000","status":"error"}
      ]}"#,
    ),
    pods(
      r#"{"items":[
        {"metadata":{"name":"p1"},"status":{"phase":"Failed","startTime":"2024-01-01T00:00:01Z"}},
        {"metadata":{"name":"p2"},"status":{"phase":"Failed","startTime":"2024-01-01T00:00:04Z"}}
      ]}"#,
    ),
  );

  let incident = a.assemble("checkout").await.unwrap();
  assert_eq!(incident.timeline.len(), 6);
  assert!(timeline::is_sorted(&incident.timeline));

  // Three events at :01, ordered logs < traces < cluster.
  let first_three: Vec<Source> = incident.timeline[..3].iter().map(|e| e.source).collect();
  assert_eq!(first_three, [Source::Logs, Source::Traces, Source::Cluster]);
}

#[tokio::test]
async fn one_failed_source_yields_partial_incident() {
  let a = assembler(
    metrics("2.0", "100"),
    logs(&[("1704067201000000000", "error: upstream reset")]),
    traces(r#"{"traces":[]}"#),
    refused(),
  );

  let incident = a.assemble("checkout").await.unwrap();
  assert!(incident.partial);
  assert_eq!(incident.degraded_sources.len(), 1);
  assert_eq!(incident.degraded_sources[0].source, Source::Cluster);
  assert_eq!(incident.degraded_sources[0].kind, FailureKind::Transport);
  assert_eq!(incident.impact.failing_pod_count, 0);
  assert_eq!(incident.impact.error_rate_percent, 2.0);
  assert_eq!(incident.severity, Severity::Warning);
}

#[tokio::test]
async fn malformed_payload_degrades_instead_of_failing() {
  let a = assembler(
    metrics("0", "100"),
    StaticSource::ok("<html>502 Bad Gateway</html>"),
    traces(r#"{"traces":[]}"#),
    pods(r#"{"items":[]}"#),
  );

  let incident = a.assemble("checkout").await.unwrap();
  assert!(incident.is_degraded(Source::Logs));
  assert_eq!(incident.degraded_sources[0].kind, FailureKind::Parse);
  assert_eq!(incident.root_cause, "");
}

/// A client whose fetch panics mid-request.
struct PanickingSource;

#[async_trait]
impl SourceClient for PanickingSource {
  fn name(&self) -> &'static str {
    "panicking"
  }

  async fn fetch(&self, _query: &str) -> Result<Bytes, TransportError> {
    panic!("connection pool poisoned");
  }
}

#[tokio::test]
async fn panicking_source_is_recorded_as_degraded() {
  let a = Assembler::new(
    Config::default(),
    Sources {
      metrics: Arc::new(metrics("6.0", "100")),
      logs: Arc::new(PanickingSource),
      traces: Arc::new(traces(r#"{"traces":[]}"#)),
      cluster: Arc::new(pods(r#"{"items":[]}"#)),
    },
  );

  let incident = a.assemble("checkout").await.unwrap();
  assert!(incident.partial);
  assert_eq!(incident.degraded_sources.len(), 1);
  assert_eq!(incident.degraded_sources[0].source, Source::Logs);
  assert_eq!(incident.degraded_sources[0].kind, FailureKind::Panicked);
  assert!(incident.degraded_sources[0].reason.starts_with("task panicked"));
  assert_eq!(incident.severity, Severity::Critical);

  let json = serde_json::to_value(&incident).unwrap();
  assert_eq!(json["degraded_sources"][0]["kind"], "panicked");
}

#[tokio::test]
async fn unparseable_pod_timestamps_still_drive_severity() {
  let failed = r#"{"metadata":{"name":"p"},"status":{"phase":"Failed","startTime":"not-a-time"}}"#;
  let items = vec![failed; 5].join(",");
  let a = assembler(
    metrics("0", "100"),
    logs(&[("1704067201000000000", "info: fine")]),
    traces(r#"{"traces":[]}"#),
    pods(&format!(r#"{{"items":[{}]}}"#, items)),
  );

  let incident = a.assemble("checkout").await.unwrap();
  assert!(!incident.is_degraded(Source::Cluster));
  assert_eq!(incident.impact.failing_pod_count, 5);
  assert_eq!(incident.severity, Severity::Critical);
  assert!(incident.timeline.iter().all(|e| e.source != Source::Cluster));
}

#[tokio::test]
async fn all_sources_failing_is_an_error() {
  let a = assembler(refused(), refused(), refused(), refused());
  let err = a.assemble("checkout").await.unwrap_err();
  match err {
    EngineError::AllSourcesFailed { service, failures } => {
      assert_eq!(service, "checkout");
      assert_eq!(failures.len(), 4);
    }
    other => panic!("expected AllSourcesFailed, got {other}"),
  }
}

#[tokio::test]
async fn slow_source_times_out_without_blocking_assembly() {
  let config = Config {
    source_timeout_ms: 100,
    ..Config::default()
  };
  let a = Assembler::new(
    config,
    Sources {
      metrics: Arc::new(metrics("0", "100")),
      logs: Arc::new(logs(&[("1704067201000000000", "info: fine")])),
      traces: Arc::new(traces(r#"{"traces":[]}"#).with_delay(Duration::from_secs(5))),
      cluster: Arc::new(pods(r#"{"items":[]}"#)),
    },
  );

  let started = std::time::Instant::now();
  let incident = a.assemble("checkout").await.unwrap();
  assert!(started.elapsed() < Duration::from_secs(2));
  assert!(incident.is_degraded(Source::Traces));
  assert_eq!(incident.degraded_sources[0].kind, FailureKind::Timeout);
  assert_eq!(incident.degraded_sources[0].reason, "timed out after 100ms");
}

#[tokio::test]
async fn root_cause_falls_back_to_trace_failure() {
  let a = assembler(
    metrics("0", "100"),
    logs(&[("1704067201000000000", "info: fine")]),
    traces(r#"{"traces":[{"traceID":"t9","startTimeUnixNano":"1704067202000000000","status":"error"}]}"#),
    pods(r#"{"items":[]}"#),
  );
  let incident = a.assemble("checkout").await.unwrap();
  assert_eq!(incident.root_cause, "trace t9 failed (status error)");
}

#[tokio::test]
async fn repeated_assembly_is_deterministic() {
  let build = || {
    assembler(
      metrics("1.5", "300"),
      logs(&[("1704067201000000000", "error: disk full")]),
      traces(r#"{"traces":[]}"#),
      pods(r#"{"items":[]}"#),
    )
  };

  let first = build().assemble("checkout").await.unwrap();
  let second = build().assemble("checkout").await.unwrap();
  assert_eq!(first.digest, second.digest);
  assert_eq!(
    serde_json::to_string(&first).unwrap(),
    serde_json::to_string(&second).unwrap()
  );

  let worse = assembler(
    metrics("7.5", "300"),
    logs(&[("1704067201000000000", "error: disk full")]),
    traces(r#"{"traces":[]}"#),
    pods(r#"{"items":[]}"#),
  )
  .assemble("checkout")
  .await
  .unwrap();
  assert_ne!(first.digest, worse.digest);
}

#[tokio::test]
async fn incident_serializes_with_lowercase_enums() {
  let a = assembler(
    metrics("0", "100"),
    logs(&[("1704067201000000000", "error: x")]),
    traces(r#"{"traces":[]}"#),
    refused(),
  );
  let incident = a.assemble("checkout").await.unwrap();
  let json = serde_json::to_value(&incident).unwrap();

  assert_eq!(json["severity"], "healthy");
  assert_eq!(json["timeline"][0]["source"], "logs");
  assert_eq!(json["timeline"][0]["time"], "2024-01-01T00:00:01Z");
  assert_eq!(json["degraded_sources"][0]["source"], "cluster");
  assert_eq!(json["degraded_sources"][0]["kind"], "transport");
  assert_eq!(json["partial"], true);
}

#[test]
fn from_config_rejects_bad_urls() {
  let config = Config {
    tempo_url: "tempo:3200".into(),
    ..Config::default()
  };
  assert!(matches!(
    Assembler::from_config(config),
    Err(EngineError::Configuration(_))
  ));
}
