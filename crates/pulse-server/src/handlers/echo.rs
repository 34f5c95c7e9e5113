//! Uninstrumented echo handler.

use axum::{http::StatusCode, response::Response};

use pulse_core::StatusMessage;

use crate::handlers::{error_response, json_response};

pub async fn echo() -> Response {
    match StatusMessage::success().to_json_line() {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}
