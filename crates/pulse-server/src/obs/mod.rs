//! Observability: the metrics registry, the span pipeline, and log setup.
//!
//! Metrics are plain atomics rendered by the scrape handler. Spans are queued
//! on a bounded channel and shipped by a background worker.

pub mod export;
pub mod logging;
pub mod metrics;
pub mod trace;
