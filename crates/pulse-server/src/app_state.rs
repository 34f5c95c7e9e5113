//! Shared application state for the instrumented service.
//!
//! The metrics registry and the tracer are constructed once at startup and
//! handed to every handler through axum's `State` extractor.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PulseConfig;
use crate::obs::metrics::PulseMetrics;
use crate::obs::trace::Tracer;

/// Extra counter reporting spans lost before export.
pub const SPANS_DROPPED_TOTAL: &str = "pulse_trace_spans_dropped_total";

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: PulseConfig,
    metrics: PulseMetrics,
    tracer: Tracer,
    draining: AtomicBool,
}

impl AppState {
    pub fn new(cfg: PulseConfig, tracer: Tracer) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics: PulseMetrics::new(),
                tracer,
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn cfg(&self) -> &PulseConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &PulseMetrics {
        &self.inner.metrics
    }

    pub fn tracer(&self) -> &Tracer {
        &self.inner.tracer
    }

    /// Mark draining state; `/readyz` reports 503 from now on.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }

    /// Wait for `signal`, mark draining, then keep accepting for `grace` so
    /// `/readyz` answers 503 before the listener closes. Used as the shutdown
    /// future handed to `transport::serve`.
    pub async fn drain_after<F>(self, signal: F, grace: Duration)
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.set_draining();
        tracing::info!(grace = ?grace, "draining, readiness now reports 503");
        tokio::time::sleep(grace).await;
    }

    /// Counters owned outside the registry, rendered after it.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![(SPANS_DROPPED_TOTAL, self.inner.tracer.dropped_spans())]
    }
}
