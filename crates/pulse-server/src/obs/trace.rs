//! Span lifecycle and the batching export worker.
//!
//! A [`Tracer`] hands out [`ActiveSpan`]s. Ending a span (explicitly or by
//! drop) pushes a finished [`SpanRecord`] into a bounded queue with
//! `try_send`, so the request path never waits on the collector: when the
//! queue is full the span is dropped and counted. A single worker task drains
//! the queue, exporting whenever `max_batch` spans are buffered or the batch
//! interval ticks. [`TraceProvider::shutdown`] flushes whatever is queued,
//! bounded by a deadline.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use pulse_core::error::{PulseError, Result};

use crate::config::TracingSection;
use crate::obs::export::SpanExporter;

/// Span kind, as OTLP numbers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    Server,
}

impl SpanKind {
    pub fn otlp_code(self) -> u8 {
        match self {
            SpanKind::Internal => 1,
            SpanKind::Server => 2,
        }
    }
}

/// Span status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    /// Status not set
    Unset,
    /// Operation completed successfully
    Ok,
    /// Operation failed
    Error(String),
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "UNSET"),
            Self::Ok => write!(f, "OK"),
            Self::Error(msg) => write!(f, "ERROR: {}", msg),
        }
    }
}

/// A finished span, ready for export.
#[derive(Debug, Clone)]
pub struct SpanRecord {
    /// Instrumentation scope (tracer name).
    pub scope: Arc<str>,
    pub name: String,
    /// 128-bit trace id, 32 hex chars.
    pub trace_id: String,
    /// 64-bit span id, 16 hex chars.
    pub span_id: String,
    pub kind: SpanKind,
    pub start: SystemTime,
    pub end: SystemTime,
    pub attributes: Vec<(String, String)>,
    pub status: SpanStatus,
}

impl SpanRecord {
    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start).unwrap_or_default()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

enum Command {
    Export(SpanRecord),
    Shutdown(oneshot::Sender<()>),
}

/// Creates spans for one instrumentation scope. Cheap to clone.
#[derive(Clone)]
pub struct Tracer {
    scope: Arc<str>,
    tx: mpsc::Sender<Command>,
    dropped: Arc<AtomicU64>,
}

impl Tracer {
    /// Start a root server span. The start timestamp is taken here.
    pub fn start(&self, name: impl Into<String>) -> ActiveSpan {
        ActiveSpan {
            open: Some(OpenSpan {
                scope: Arc::clone(&self.scope),
                name: name.into(),
                trace_id: new_trace_id(),
                span_id: new_span_id(),
                kind: SpanKind::Server,
                start_wall: SystemTime::now(),
                start_mono: Instant::now(),
                attributes: Vec::new(),
                status: SpanStatus::Unset,
            }),
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Spans lost because the queue was full or the pipeline was shut down.
    pub fn dropped_spans(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct OpenSpan {
    scope: Arc<str>,
    name: String,
    trace_id: String,
    span_id: String,
    kind: SpanKind,
    start_wall: SystemTime,
    start_mono: Instant,
    attributes: Vec<(String, String)>,
    status: SpanStatus,
}

/// An in-flight span. Ends on [`ActiveSpan::end`] or when dropped.
pub struct ActiveSpan {
    open: Option<OpenSpan>,
    tx: mpsc::Sender<Command>,
    dropped: Arc<AtomicU64>,
}

impl ActiveSpan {
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(open) = self.open.as_mut() {
            open.attributes.push((key.into(), value.into()));
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        if let Some(open) = self.open.as_mut() {
            open.status = SpanStatus::Error(message.into());
        }
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        let Some(open) = self.open.take() else { return; };
        // end = wall-clock start + monotonic elapsed
        let end = open.start_wall + open.start_mono.elapsed();
        let record = SpanRecord {
            scope: open.scope,
            name: open.name,
            trace_id: open.trace_id,
            span_id: open.span_id,
            kind: open.kind,
            start: open.start_wall,
            end,
            attributes: open.attributes,
            status: open.status,
        };
        if self.tx.try_send(Command::Export(record)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Owns the export worker. Held by `main` for the process lifetime.
pub struct TraceProvider {
    tx: mpsc::Sender<Command>,
    dropped: Arc<AtomicU64>,
}

impl TraceProvider {
    /// Spawn the export worker on the current tokio runtime.
    pub fn install(exporter: Arc<dyn SpanExporter>, cfg: &TracingSection) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        tokio::spawn(run_worker(rx, exporter, cfg.max_batch, cfg.batch_interval()));
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn tracer(&self, scope: &str) -> Tracer {
        Tracer {
            scope: Arc::from(scope),
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    pub fn dropped_spans(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Export everything queued so far and stop the worker.
    /// Returns `Timeout` if the flush does not complete within `deadline`.
    pub async fn shutdown(&self, deadline: Duration) -> Result<()> {
        let tx = self.tx.clone();
        let flush = async move {
            let (ack_tx, ack_rx) = oneshot::channel();
            tx.send(Command::Shutdown(ack_tx))
                .await
                .map_err(|_| PulseError::Internal("trace worker already stopped".into()))?;
            ack_rx.await.map_err(|_| {
                PulseError::Internal("trace worker exited before acknowledging flush".into())
            })
        };
        tokio::time::timeout(deadline, flush)
            .await
            .map_err(|_| PulseError::Timeout(format!("trace flush exceeded {deadline:?}")))?
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Command>,
    exporter: Arc<dyn SpanExporter>,
    max_batch: usize,
    interval: Duration,
) {
    let mut batch: Vec<SpanRecord> = Vec::with_capacity(max_batch);
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tick.tick().await;

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Export(span)) => {
                    batch.push(span);
                    if batch.len() >= max_batch {
                        flush(exporter.as_ref(), &mut batch).await;
                    }
                }
                Some(Command::Shutdown(ack)) => {
                    rx.close();
                    while let Ok(cmd) = rx.try_recv() {
                        if let Command::Export(span) = cmd {
                            batch.push(span);
                            if batch.len() >= max_batch {
                                flush(exporter.as_ref(), &mut batch).await;
                            }
                        }
                    }
                    flush(exporter.as_ref(), &mut batch).await;
                    if let Err(e) = exporter.shutdown().await {
                        tracing::warn!(error = %e, "span exporter shutdown failed");
                    }
                    let _ = ack.send(());
                    tracing::debug!("trace worker stopped");
                    return;
                }
                None => {
                    flush(exporter.as_ref(), &mut batch).await;
                    return;
                }
            },

            _ = tick.tick() => {
                flush(exporter.as_ref(), &mut batch).await;
            }
        }
    }
}

async fn flush(exporter: &dyn SpanExporter, batch: &mut Vec<SpanRecord>) {
    if batch.is_empty() {
        return;
    }
    let spans = std::mem::take(batch);
    let n = spans.len();
    match exporter.export(spans).await {
        Ok(()) => tracing::trace!(spans = n, "exported span batch"),
        Err(e) => tracing::warn!(error = %e, spans = n, "span export failed, batch dropped"),
    }
}

/// Random 128-bit trace ID (32 hex chars).
fn new_trace_id() -> String {
    format!("{:032x}", Uuid::new_v4().as_u128())
}

/// Random 64-bit span ID (16 hex chars). Never zero: the v4 variant bits
/// live in the low half.
fn new_span_id() -> String {
    let (_, lo) = Uuid::new_v4().as_u64_pair();
    format!("{:016x}", lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_otlp_lengths() {
        assert_eq!(new_trace_id().len(), 32);
        let sid = new_span_id();
        assert_eq!(sid.len(), 16);
        assert_ne!(sid, "0000000000000000");
    }

    #[test]
    fn status_display() {
        assert_eq!(SpanStatus::Unset.to_string(), "UNSET");
        assert_eq!(SpanStatus::Error("boom".into()).to_string(), "ERROR: boom");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let tracer = Tracer {
            scope: Arc::from("test"),
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        tracer.start("a").end();
        tracer.start("b").end();
        drop(tracer.start("c"));
        assert_eq!(tracer.dropped_spans(), 2);
    }

    #[tokio::test]
    async fn end_is_idempotent_with_drop() {
        let (tx, mut rx) = mpsc::channel(8);
        let tracer = Tracer {
            scope: Arc::from("test"),
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        let mut span = tracer.start("once");
        span.set_attribute("k", "v");
        span.end();
        drop(tracer);

        let mut seen = 0;
        while let Some(cmd) = rx.recv().await {
            if let Command::Export(rec) = cmd {
                assert_eq!(rec.name, "once");
                assert_eq!(rec.attribute("k"), Some("v"));
                assert!(rec.end >= rec.start);
                seen += 1;
            }
        }
        assert_eq!(seen, 1);
    }
}
