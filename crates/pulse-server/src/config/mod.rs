//! Server config loader (strict parsing).
//!
//! The file is optional: when it does not exist the built-in defaults apply,
//! which match the documented listen address and transport timeouts.

pub mod schema;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use pulse_core::error::{PulseError, Result};

pub use schema::{LoggingSection, PulseConfig, RoutesSection, ServerSection, TracingSection};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PULSE_CONFIG";
/// Config file looked up in the working directory when `PULSE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "pulse.yaml";

pub fn load_from_file(path: impl AsRef<Path>) -> Result<PulseConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| PulseError::Internal(format!("read config {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<PulseConfig> {
    let cfg: PulseConfig = serde_yaml::from_str(s)
        .map_err(|e| PulseError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load `path`, falling back to defaults when the file does not exist.
/// Any other failure (unreadable, invalid) is still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<PulseConfig> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let cfg = PulseConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) => Err(PulseError::Internal(format!(
            "read config {} failed: {e}",
            path.display()
        ))),
    }
}

/// Resolve the config path from the environment and load it.
pub fn load_from_env() -> Result<PulseConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_or_default(path)
}
