//! Shared error type across pulse crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input or configuration.
    BadRequest,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// A collaborator (collector, listener) is not available.
    Unavailable,
    /// A deadline elapsed.
    Timeout,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("exporter: {0}")]
    Exporter(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl PulseError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            PulseError::BadRequest(_) => ClientCode::BadRequest,
            PulseError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            PulseError::Exporter(_) => ClientCode::Unavailable,
            PulseError::Timeout(_) => ClientCode::Timeout,
            PulseError::Io(_) | PulseError::Internal(_) => ClientCode::Internal,
        }
    }
}
