#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use pulse_server::app_state::AppState;
use pulse_server::config::PulseConfig;
use pulse_server::obs::export::{InMemoryExporter, SpanExporter};
use pulse_server::obs::trace::TraceProvider;

pub struct Harness {
    pub state: AppState,
    pub provider: TraceProvider,
}

/// State wired to `exporter`. Must run inside a tokio runtime.
pub fn harness_with(cfg: PulseConfig, exporter: Arc<dyn SpanExporter>) -> Harness {
    let provider = TraceProvider::install(exporter, &cfg.tracing);
    let state = AppState::new(cfg.clone(), provider.tracer(&cfg.tracing.scope));
    Harness { state, provider }
}

pub fn harness() -> (Harness, InMemoryExporter) {
    let exporter = InMemoryExporter::new();
    let h = harness_with(PulseConfig::default(), Arc::new(exporter.clone()));
    (h, exporter)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

pub const GET_API: [(&str, &str); 2] = [("method", "GET"), ("endpoint", "/api/v1/")];
