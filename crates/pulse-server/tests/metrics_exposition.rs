//! `/metrics/` scrape output.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use pulse_server::router::build_router;

use common::{get, harness};

#[tokio::test]
async fn metrics_endpoint_uses_exposition_content_type() {
    let (h, _) = harness();
    let app = build_router(h.state.clone());

    let resp = app
        .oneshot(Request::builder().uri("/metrics/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );
}

#[tokio::test]
async fn counter_line_appears_after_request() {
    let (h, _) = harness();
    let app = build_router(h.state.clone());

    let (_, body) = get(&app, "/api/v1/").await;
    assert_eq!(body, "{\"message\":\"success\"}\n");

    let (status, text) = get(&app, "/metrics/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("# HELP http_requests_total Total HTTP requests."));
    assert!(text.contains("# TYPE http_requests_total counter"));
    assert!(text.contains("# TYPE http_requests_per_second gauge"));
    assert!(text.contains(r#"http_requests_total{endpoint="/api/v1/",method="GET"} 1"#));
    assert!(text.contains(r#"http_requests_per_second{endpoint="/api/v1/",method="GET"} "#));
    assert!(text.contains("pulse_trace_spans_dropped_total 0"));
}

#[tokio::test]
async fn scrapes_are_not_counted_as_api_requests() {
    let (h, _) = harness();
    let app = build_router(h.state.clone());

    get(&app, "/metrics/").await;
    get(&app, "/metrics").await;
    let (_, text) = get(&app, "/metrics/").await;
    assert!(!text.contains("http_requests_total{"));
}

#[tokio::test]
async fn gauge_value_is_a_plain_positive_number() {
    let (h, _) = harness();
    let app = build_router(h.state.clone());
    get(&app, "/api/v1/").await;

    let (_, text) = get(&app, "/metrics/").await;
    let line = text
        .lines()
        .find(|l| l.starts_with("http_requests_per_second{"))
        .expect("gauge line");
    let value: f64 = line.rsplit(' ').next().unwrap().parse().unwrap();
    assert!(value.is_finite() && value > 0.0);
}

#[tokio::test]
async fn health_endpoints() {
    let (h, _) = harness();
    let app = build_router(h.state.clone());

    assert_eq!(get(&app, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    assert_eq!(get(&app, "/readyz").await, (StatusCode::OK, "ready".to_string()));

    h.state.set_draining();
    assert_eq!(
        get(&app, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "draining".to_string())
    );
}
