//! pulse server library entry.
//!
//! Wires the config loader, metrics registry, span pipeline, handlers, and
//! the HTTP transport into the two services. Consumed by the binaries
//! (`main.rs` for the instrumented service, `bin/echo.rs` for the echo
//! service) and by integration tests.

pub mod app_state;
pub mod config;
pub mod handlers;
pub mod obs;
pub mod ops;
pub mod router;
pub mod transport;
