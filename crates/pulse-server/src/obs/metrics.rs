//! Metrics registry for the instrumented service.
//!
//! Counter and gauge families with dynamic labels backed by `DashMap`. Labels
//! are flattened into sorted key vectors to keep deterministic ordering.
//! Gauges hold an `f64` as its bit pattern in an `AtomicU64`, so an update is
//! a single atomic store (last write wins).

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Prometheus spelling of special float values.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

fn render_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value, or `None` if the label set was never observed.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map
            .get(&label_key(labels))
            .map(|c| c.value().load(Ordering::Relaxed))
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        render_header(out, name, help, "counter");
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, render_labels(r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl GaugeVec {
    /// Overwrite the value for a label set.
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        let key = label_key(labels);
        if let Some(g) = self.map.get(&key) {
            g.store(v.to_bits(), Ordering::Relaxed);
            return;
        }
        self.map
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map
            .get(&label_key(labels))
            .map(|g| f64::from_bits(g.value().load(Ordering::Relaxed)))
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        render_header(out, name, help, "gauge");
        for r in self.map.iter() {
            let val = f64::from_bits(r.value().load(Ordering::Relaxed));
            let _ = writeln!(
                out,
                "{}{{{}}} {}",
                name,
                render_labels(r.key()),
                format_float(val)
            );
        }
    }
}

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUESTS_PER_SECOND: &str = "http_requests_per_second";

/// Registry owned by the application state; lives as long as the process.
#[derive(Default)]
pub struct PulseMetrics {
    /// Requests seen, keyed by `method` and `endpoint`.
    pub http_requests: CounterVec,
    /// Reciprocal of the last request's handling time, same keys.
    pub http_requests_per_second: GaugeVec,
}

impl PulseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render all registered metrics plus any extra counters provided by callers.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.http_requests
            .render(HTTP_REQUESTS_TOTAL, "Total HTTP requests.", &mut out);
        self.http_requests_per_second.render(
            HTTP_REQUESTS_PER_SECOND,
            "HTTP requests per second.",
            &mut out,
        );
        for (k, v) in extra {
            let _ = writeln!(out, "# TYPE {} counter\n{} {}", k, k, v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_order_does_not_split_series() {
        let c = CounterVec::default();
        c.inc(&[("method", "GET"), ("endpoint", "/a/")]);
        c.inc(&[("endpoint", "/a/"), ("method", "GET")]);
        assert_eq!(c.get(&[("method", "GET"), ("endpoint", "/a/")]), Some(2));
    }

    #[test]
    fn gauge_is_overwritten() {
        let g = GaugeVec::default();
        g.set(&[("k", "v")], 10.0);
        g.set(&[("k", "v")], 2.5);
        assert_eq!(g.get(&[("k", "v")]), Some(2.5));
        assert_eq!(g.get(&[("k", "other")]), None);
    }

    #[test]
    fn special_floats_use_prometheus_spelling() {
        assert_eq!(format_float(f64::INFINITY), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(0.5), "0.5");
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
