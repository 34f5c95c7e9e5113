//! Axum router wiring for both services.

use axum::{routing::get, Router};

use crate::{app_state::AppState, handlers, ops};

/// Instrumented service: the API prefix (and everything below it), the
/// scrape endpoint, and the health endpoints. The prefix without its trailing
/// slash redirects to the prefix.
pub fn build_router(state: AppState) -> Router {
    let api = state.cfg().routes.api_prefix.clone();
    let metrics = state.cfg().routes.metrics_path.clone();

    Router::new()
        .route(&api, get(handlers::api::api_v1))
        .route(&format!("{api}*rest"), get(handlers::api::api_v1))
        .route(api.trim_end_matches('/'), get(handlers::api::redirect_to_prefix))
        .route(&metrics, get(ops::metrics))
        .route(metrics.trim_end_matches('/'), get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .with_state(state)
}

/// Echo service: `GET /` only.
pub fn build_echo_router() -> Router {
    Router::new().route("/", get(handlers::echo::echo))
}
