//! Echo service: `GET /` returns the fixed payload. No instrumentation.

use std::process::ExitCode;

use pulse_core::error::Result;
use pulse_server::obs::logging;
use pulse_server::transport::{self, ServeSettings};
use pulse_server::{config, router};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pulse-echo failed");
            eprintln!("pulse-echo: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load_from_env()?;
    logging::init(&cfg.logging)?;

    let listen = cfg.server.listen_addr()?;
    tracing::info!(%listen, "pulse-echo starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    transport::serve(
        listener,
        router::build_echo_router(),
        ServeSettings::from(&cfg.server),
        transport::shutdown_signal(),
    )
    .await
}
