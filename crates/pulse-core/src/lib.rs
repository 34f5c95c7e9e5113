//! pulse core: error types and the response payload shared by both services.
//!
//! This crate carries no transport or runtime dependencies so the payload and
//! the error surface can be reused by the servers and by tests alike.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod payload;

/// Shared result type.
pub use error::{PulseError, Result};
pub use payload::StatusMessage;
