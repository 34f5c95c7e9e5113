//! Log subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulse_core::error::{PulseError, Result};

use crate::config::LoggingSection;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(cfg: &LoggingSection) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let registry = tracing_subscriber::registry().with(filter);

    let res = match cfg.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_target(true))
            .try_init(),
        _ => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    res.map_err(|e| PulseError::Internal(format!("init logging failed: {e}")))
}
