#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use fleetmetrics_core::metrics::Registry;
use fleetmetrics_core::FleetError;
use fleetmetrics_gateway::app_state::AppState;
use fleetmetrics_gateway::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:5001"
  lisen: "typo"
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, FleetError::BadRequest(_)));
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:5001");
    assert_eq!(cfg.server.listen_addr().unwrap().port(), 5001);
    assert!(cfg.metrics.latency_buckets().unwrap().is_none());
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(matches!(err, FleetError::UnsupportedVersion));
}

#[test]
fn listen_must_be_socket_addr() {
    let bad = r#"
version: 1
server:
  listen: "localhost"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, FleetError::BadRequest(_)));
}

#[test]
fn latency_buckets_parsed() {
    let ok = r#"
version: 1
metrics:
  latency_buckets_seconds: [0.01, 0.1, 1.0]
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let buckets = cfg.metrics.latency_buckets().unwrap().unwrap();
    assert_eq!(
        buckets,
        vec![Duration::from_millis(10), Duration::from_millis(100), Duration::from_secs(1)]
    );
}

#[test]
fn latency_buckets_must_increase() {
    for bad in [
        "version: 1\nmetrics:\n  latency_buckets_seconds: []\n",
        "version: 1\nmetrics:\n  latency_buckets_seconds: [0.5, 0.1]\n",
        "version: 1\nmetrics:\n  latency_buckets_seconds: [-1.0]\n",
    ] {
        let err = config::load_from_str(bad).expect_err("must fail");
        assert!(matches!(err, FleetError::BadRequest(_)), "{bad}");
    }
}

#[test]
fn sub_microsecond_buckets_rejected_at_load() {
    // Both bounds would collapse to 1µs once truncated.
    let bad = r#"
version: 1
metrics:
  latency_buckets_seconds: [0.0000015, 0.0000019, 1.0]
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    match err {
        FleetError::BadRequest(msg) => assert!(msg.contains("microseconds"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }

    let bad = "version: 1\nmetrics:\n  latency_buckets_seconds: [0.0000001]\n";
    assert!(matches!(config::load_from_str(bad), Err(FleetError::BadRequest(_))));
}

#[test]
fn accepted_buckets_register_at_startup() {
    let ok = r#"
version: 1
metrics:
  latency_buckets_seconds: [0.000001, 0.000002, 0.3]
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(
        cfg.metrics.latency_buckets().unwrap().unwrap(),
        vec![Duration::from_micros(1), Duration::from_micros(2), Duration::from_millis(300)]
    );

    let state = AppState::new(cfg, Arc::new(Registry::new())).expect("registers");
    state
        .metrics()
        .latency
        .observe_duration(&[("path", "/cars"), ("method", "get")], Duration::from_micros(2))
        .unwrap();
    let snap = state
        .metrics()
        .latency
        .histogram(&[("path", "/cars"), ("method", "get")])
        .unwrap()
        .unwrap();
    assert_eq!(snap.buckets.len(), 3);
    assert_eq!(snap.buckets[0], (Duration::from_micros(1), 0));
    assert_eq!(snap.buckets[1], (Duration::from_micros(2), 1));
}

#[test]
fn missing_file_uses_defaults() {
    let cfg = config::load_or_default("does/not/exist/fleetmetrics.yaml").expect("defaults");
    assert_eq!(cfg.server.listen, "0.0.0.0:5001");

    let err = config::load_from_file("does/not/exist/fleetmetrics.yaml").expect_err("must fail");
    assert!(matches!(err, FleetError::Internal(_)));
}
