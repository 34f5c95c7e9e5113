//! Transport layer (HTTP/1 over TCP).
//!
//! Owns the accept loop, per-connection timeouts, and graceful shutdown.

pub mod server;
pub mod signal;

pub use server::{serve, ServeSettings};
pub use signal::shutdown_signal;
