//! Request handlers for both services and the shared response helpers.

pub mod api;
pub mod echo;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;

use pulse_core::error::{ClientCode, PulseError};

pub(crate) const APPLICATION_JSON: &str = "application/json";

pub(crate) fn json_response(status: StatusCode, body: Bytes) -> Response {
    (status, [(header::CONTENT_TYPE, APPLICATION_JSON)], body).into_response()
}

/// `{"code": ..., "msg": ...}` with a status derived from the client code.
pub(crate) fn error_response(err: &PulseError) -> Response {
    let code = err.client_code();
    let status = match code {
        ClientCode::BadRequest | ClientCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
        ClientCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({ "code": code.as_str(), "msg": err.to_string() }).to_string();
    json_response(status, Bytes::from(body))
}
