//! Instrumented service.
//!
//! - `GET /api/v1/` : fixed JSON payload, counted, timed, traced
//! - `GET /metrics/`: Prometheus exposition
//! - spans exported over OTLP/HTTP, configured by `OTEL_EXPORTER_OTLP_*`

use std::process::ExitCode;
use std::sync::Arc;

use pulse_core::error::Result;
use pulse_server::obs::export::{OtlpHttpExporter, OtlpSettings};
use pulse_server::obs::{logging, trace::TraceProvider};
use pulse_server::transport::{self, ServeSettings};
use pulse_server::{app_state::AppState, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pulse-server failed");
            eprintln!("pulse-server: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load_from_env()?;
    logging::init(&cfg.logging)?;

    // Exporter construction failure is fatal: nothing is served without it.
    let exporter = OtlpHttpExporter::new(OtlpSettings::from_env(&cfg.tracing.service_name)?)?;
    tracing::info!(endpoint = %exporter.endpoint(), "trace exporter ready");
    let provider = TraceProvider::install(Arc::new(exporter), &cfg.tracing);

    let listen = cfg.server.listen_addr()?;
    let settings = ServeSettings::from(&cfg.server);
    let state = AppState::new(cfg.clone(), provider.tracer(&cfg.tracing.scope));
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "pulse-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    let drain = state.drain_after(transport::shutdown_signal(), cfg.server.drain_grace());
    transport::serve(listener, app, settings, drain).await?;

    match provider.shutdown(settings.shutdown_timeout).await {
        Ok(()) => tracing::info!("trace pipeline flushed"),
        Err(e) => tracing::warn!(error = %e, "trace pipeline flush incomplete"),
    }
    Ok(())
}
