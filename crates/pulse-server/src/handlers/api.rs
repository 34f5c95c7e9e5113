//! Instrumented handler for the API prefix.
//!
//! Per request: bump `http_requests_total`, open a span, encode the payload,
//! publish `1 / elapsed` to `http_requests_per_second`, close the span.

use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use pulse_core::StatusMessage;

use crate::app_state::AppState;
use crate::handlers::{error_response, json_response};

/// Floor applied to the measured handling time so the reciprocal stays finite.
pub const MIN_ELAPSED: Duration = Duration::from_nanos(1);

/// Reciprocal of a single request's handling time, in requests per second.
pub fn per_second(elapsed: Duration) -> f64 {
    1.0 / elapsed.max(MIN_ELAPSED).as_secs_f64()
}

pub async fn api_v1(State(app): State<AppState>, method: Method, uri: Uri) -> Response {
    let path = uri.path();
    let labels = [("method", method.as_str()), ("endpoint", path)];
    app.metrics().http_requests.inc(&labels);

    let mut span = app.tracer().start(app.cfg().tracing.span_name.as_str());
    span.set_attribute("http.method", method.as_str());
    span.set_attribute("http.route", app.cfg().routes.api_prefix.as_str());
    span.set_attribute("http.target", path);
    let started = Instant::now();

    let resp = match StatusMessage::success().to_json_line() {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, %path, "encode response failed");
            span.set_error(e.to_string());
            error_response(&e)
        }
    };

    app.metrics()
        .http_requests_per_second
        .set(&labels, per_second(started.elapsed()));
    span.end();
    resp
}

/// `GET <prefix without trailing slash>`: permanent redirect to the prefix,
/// query preserved. Not counted or traced.
pub async fn redirect_to_prefix(State(app): State<AppState>, uri: Uri) -> Response {
    let mut location = app.cfg().routes.api_prefix.clone();
    if let Some(q) = uri.query() {
        location.push('?');
        location.push_str(q);
    }
    match HeaderValue::from_str(&location) {
        Ok(v) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, v)]).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
