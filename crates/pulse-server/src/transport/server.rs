//! Accept loop serving an axum router over hyper HTTP/1 connections.
//!
//! - read timeout: request headers must arrive within it (hyper header read timer)
//! - write timeout: each request must be answered within it, or the connection is closed
//! - shutdown: stop accepting, then wait for open connections up to the deadline

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tower::ServiceExt;

use pulse_core::error::{PulseError, Result};

use crate::config::ServerSection;

#[derive(Debug, Clone, Copy)]
pub struct ServeSettings {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl From<&ServerSection> for ServeSettings {
    fn from(s: &ServerSection) -> Self {
        Self {
            read_timeout: s.read_timeout(),
            write_timeout: s.write_timeout(),
            shutdown_timeout: s.shutdown_timeout(),
        }
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    settings: ServeSettings,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let local = listener.local_addr()?;
    let graceful = GracefulShutdown::new();

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(settings.read_timeout);

    tokio::pin!(shutdown);
    tracing::info!(%local, "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let router = router.clone();
                let write_timeout = settings.write_timeout;
                let svc = service_fn(move |req: Request<Incoming>| {
                    respond(router.clone(), req, write_timeout)
                });

                let conn = builder.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        tracing::debug!(%remote, error = %e, "connection closed with error");
                    }
                });
            }

            _ = &mut shutdown => {
                tracing::info!("shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    match tokio::time::timeout(settings.shutdown_timeout, graceful.shutdown()).await {
        Ok(()) => tracing::info!("all connections closed"),
        Err(_) => tracing::warn!(
            deadline = ?settings.shutdown_timeout,
            "shutdown deadline elapsed with connections still open"
        ),
    }
    Ok(())
}

async fn respond(
    router: Router,
    req: Request<Incoming>,
    write_timeout: Duration,
) -> std::result::Result<axum::response::Response, PulseError> {
    match tokio::time::timeout(write_timeout, router.oneshot(req)).await {
        Ok(Ok(resp)) => Ok(resp),
        Ok(Err(never)) => {
            let never: Infallible = never;
            match never {}
        }
        Err(_) => Err(PulseError::Timeout(format!(
            "response not written within {write_timeout:?}"
        ))),
    }
}
