use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use pulse_core::error::{PulseError, Result};

const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 1..=600_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulseConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub routes: RoutesSection,

    #[serde(default)]
    pub tracing: TracingSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            routes: RoutesSection::default(),
            tracing: TracingSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl PulseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PulseError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.routes.validate()?;
        self.tracing.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Time between the shutdown signal and closing the listener, during
    /// which `/readyz` answers 503.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        for (name, v) in [
            ("server.read_timeout_ms", self.read_timeout_ms),
            ("server.write_timeout_ms", self.write_timeout_ms),
            ("server.shutdown_timeout_ms", self.shutdown_timeout_ms),
        ] {
            if !TIMEOUT_RANGE_MS.contains(&v) {
                return Err(PulseError::BadRequest(format!(
                    "{name} must be between 1 and 600000"
                )));
            }
        }
        if self.drain_grace_ms > *TIMEOUT_RANGE_MS.end() {
            return Err(PulseError::BadRequest(
                "server.drain_grace_ms must be at most 600000".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            PulseError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".into()
}
fn default_read_timeout_ms() -> u64 {
    1000
}
fn default_write_timeout_ms() -> u64 {
    10000
}
fn default_shutdown_timeout_ms() -> u64 {
    5000
}
fn default_drain_grace_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesSection {
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for RoutesSection {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            metrics_path: default_metrics_path(),
        }
    }
}

/// Health endpoints registered next to the configurable routes.
const RESERVED_PATHS: [&str; 2] = ["/healthz", "/readyz"];

impl RoutesSection {
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("routes.api_prefix", &self.api_prefix),
            ("routes.metrics_path", &self.metrics_path),
        ] {
            if !p.starts_with('/') || !p.ends_with('/') {
                return Err(PulseError::BadRequest(format!(
                    "{name} must start and end with '/'"
                )));
            }
            if p.trim_end_matches('/').is_empty() {
                return Err(PulseError::BadRequest(format!("{name} must not be '/'")));
            }
            if p.contains("//") {
                return Err(PulseError::BadRequest(format!(
                    "{name} must not contain empty segments"
                )));
            }
        }
        if self.api_prefix == self.metrics_path {
            return Err(PulseError::BadRequest(
                "routes.api_prefix and routes.metrics_path must differ".into(),
            ));
        }
        for (name, p) in [
            ("routes.api_prefix", &self.api_prefix),
            ("routes.metrics_path", &self.metrics_path),
        ] {
            if RESERVED_PATHS.contains(&p.trim_end_matches('/')) {
                return Err(PulseError::BadRequest(format!("{name} is reserved")));
            }
        }
        Ok(())
    }
}

fn default_api_prefix() -> String {
    "/api/v1/".into()
}
fn default_metrics_path() -> String {
    "/metrics/".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingSection {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_span_name")]
    pub span_name: String,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
}

impl Default for TracingSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            scope: default_scope(),
            span_name: default_span_name(),
            queue_capacity: default_queue_capacity(),
            max_batch: default_max_batch(),
            batch_interval_ms: default_batch_interval_ms(),
        }
    }
}

impl TracingSection {
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() || self.scope.is_empty() || self.span_name.is_empty() {
            return Err(PulseError::BadRequest(
                "tracing.service_name, tracing.scope and tracing.span_name must not be empty"
                    .into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PulseError::BadRequest("tracing.queue_capacity must be >= 1".into()));
        }
        if self.max_batch == 0 || self.max_batch > self.queue_capacity {
            return Err(PulseError::BadRequest(
                "tracing.max_batch must be between 1 and queue_capacity".into(),
            ));
        }
        if self.batch_interval_ms == 0 {
            return Err(PulseError::BadRequest("tracing.batch_interval_ms must be >= 1".into()));
        }
        Ok(())
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

fn default_service_name() -> String {
    "http-server".into()
}
fn default_scope() -> String {
    "http-handler".into()
}
fn default_span_name() -> String {
    "http-request".into()
}
fn default_queue_capacity() -> usize {
    2048
}
fn default_max_batch() -> usize {
    512
}
fn default_batch_interval_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl LoggingSection {
    pub fn validate(&self) -> Result<()> {
        match self.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(PulseError::BadRequest(format!(
                "logging.format must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

fn default_level() -> String {
    "info".into()
}
fn default_format() -> String {
    "text".into()
}
