#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use pulse_core::PulseError;
use pulse_server::app_state::AppState;
use pulse_server::config;
use pulse_server::obs::export::InMemoryExporter;
use pulse_server::obs::trace::TraceProvider;
use pulse_server::router::build_router;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:5000"
  read_timeout: 1000 # missing _ms suffix should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config_uses_documented_defaults() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.server.listen, "0.0.0.0:5000");
    assert_eq!(cfg.server.read_timeout(), Duration::from_secs(1));
    assert_eq!(cfg.server.write_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.server.drain_grace(), Duration::from_secs(1));
    assert_eq!(cfg.routes.api_prefix, "/api/v1/");
    assert_eq!(cfg.routes.metrics_path, "/metrics/");
    assert_eq!(cfg.tracing.service_name, "http-server");
    assert_eq!(cfg.tracing.scope, "http-handler");
    assert_eq!(cfg.tracing.span_name, "http-request");
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(matches!(err, PulseError::UnsupportedVersion));
}

#[test]
fn rejects_bad_listen_address() {
    let err = config::load_from_str("version: 1\nserver:\n  listen: \"nope\"\n")
        .expect_err("must fail");
    assert!(err.to_string().contains("server.listen"));
}

#[test]
fn rejects_zero_timeout() {
    let err = config::load_from_str("version: 1\nserver:\n  write_timeout_ms: 0\n")
        .expect_err("must fail");
    assert!(err.to_string().contains("server.write_timeout_ms"));
}

#[test]
fn rejects_route_without_slashes() {
    let err = config::load_from_str("version: 1\nroutes:\n  api_prefix: \"api\"\n")
        .expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");

    let err = config::load_from_str(
        "version: 1\nroutes:\n  api_prefix: \"/x/\"\n  metrics_path: \"/x/\"\n",
    )
    .expect_err("must fail");
    assert!(err.to_string().contains("must differ"));
}

#[test]
fn rejects_routes_with_empty_segments() {
    for yaml in [
        "version: 1\nroutes:\n  metrics_path: \"//\"\n",
        "version: 1\nroutes:\n  metrics_path: \"/\"\n",
        "version: 1\nroutes:\n  api_prefix: \"/a//b/\"\n",
        "version: 1\nroutes:\n  api_prefix: \"/api/v1//\"\n",
    ] {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{yaml}");
    }
}

#[test]
fn rejects_routes_shadowing_health_endpoints() {
    let err = config::load_from_str("version: 1\nroutes:\n  api_prefix: \"/readyz/\"\n")
        .expect_err("must fail");
    assert!(err.to_string().contains("reserved"));

    let err = config::load_from_str("version: 1\nroutes:\n  metrics_path: \"/healthz/\"\n")
        .expect_err("must fail");
    assert!(err.to_string().contains("reserved"));
}

#[tokio::test]
async fn accepted_routes_build_a_router() {
    let cfg = config::load_from_str(
        "version: 1\nroutes:\n  api_prefix: \"/a/\"\n  metrics_path: \"/a/b/\"\n",
    )
    .expect("must parse");
    let tracer = TraceProvider::install(Arc::new(InMemoryExporter::new()), &cfg.tracing)
        .tracer(&cfg.tracing.scope);
    let _ = build_router(AppState::new(cfg, tracer));
}

#[test]
fn rejects_oversized_drain_grace() {
    let err = config::load_from_str("version: 1\nserver:\n  drain_grace_ms: 600001\n")
        .expect_err("must fail");
    assert!(err.to_string().contains("server.drain_grace_ms"));
}

#[test]
fn rejects_batch_larger_than_queue() {
    let err = config::load_from_str(
        "version: 1\ntracing:\n  queue_capacity: 8\n  max_batch: 16\n",
    )
    .expect_err("must fail");
    assert!(err.to_string().contains("tracing.max_batch"));
}

#[test]
fn rejects_unknown_log_format() {
    let err = config::load_from_str("version: 1\nlogging:\n  format: \"xml\"\n")
        .expect_err("must fail");
    assert!(err.to_string().contains("logging.format"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = config::load_or_default("/definitely/not/here/pulse.yaml").expect("defaults");
    assert_eq!(cfg.server.listen, "0.0.0.0:5000");
}

#[test]
fn load_from_file_reads_yaml() {
    let dir = std::env::temp_dir().join(format!("pulse-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("pulse.yaml");
    std::fs::write(
        &path,
        "version: 1\nserver:\n  listen: \"127.0.0.1:5001\"\nlogging:\n  format: json\n",
    )
    .unwrap();

    let cfg = config::load_from_file(&path).expect("must parse");
    assert_eq!(cfg.server.listen, "127.0.0.1:5001");
    assert_eq!(cfg.logging.format, "json");

    let cfg = config::load_or_default(&path).expect("must parse");
    assert_eq!(cfg.server.listen, "127.0.0.1:5001");
    std::fs::remove_dir_all(&dir).unwrap();
}
