//! Top-level facade crate for pulse.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use pulse_core::*;
}

pub mod server {
    pub use pulse_server::*;
}
