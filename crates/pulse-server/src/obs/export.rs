//! Span exporters.
//!
//! [`OtlpHttpExporter`] ships batches to a collector as OTLP/HTTP JSON and is
//! configured from the standard `OTEL_EXPORTER_OTLP_*` environment variables.
//! [`InMemoryExporter`] keeps spans in memory for tests and local runs.

use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;

use pulse_core::error::{PulseError, Result};

use crate::obs::trace::{SpanRecord, SpanStatus};

/// Destination for finished span batches. Called only from the export worker.
#[async_trait]
pub trait SpanExporter: Send + Sync {
    async fn export(&self, batch: Vec<SpanRecord>) -> Result<()>;

    /// Release exporter resources after the final flush.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

const DEFAULT_ENDPOINT: &str = "http://localhost:4318";
const TRACES_PATH: &str = "/v1/traces";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Exporter settings resolved from `OTEL_*` variables.
#[derive(Debug, Clone)]
pub struct OtlpSettings {
    pub endpoint: Url,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub service_name: String,
}

impl OtlpSettings {
    pub fn from_env(default_service_name: &str) -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok(), default_service_name)
    }

    /// Resolve settings through `lookup`. Signal-specific variables win over
    /// the generic ones; empty values count as unset.
    pub fn from_lookup<F>(lookup: F, default_service_name: &str) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let endpoint = match get("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT") {
            Some(full) => full,
            None => {
                let base = get("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
                format!("{}{}", base.trim_end_matches('/'), TRACES_PATH)
            }
        };
        let endpoint = Url::parse(endpoint.trim()).map_err(|e| {
            PulseError::Exporter(format!("invalid OTLP endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(PulseError::Exporter(format!(
                "OTLP endpoint must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }

        let headers = match get("OTEL_EXPORTER_OTLP_TRACES_HEADERS")
            .or_else(|| get("OTEL_EXPORTER_OTLP_HEADERS"))
        {
            Some(raw) => parse_headers(&raw)?,
            None => HeaderMap::new(),
        };

        let timeout_ms = match get("OTEL_EXPORTER_OTLP_TRACES_TIMEOUT")
            .or_else(|| get("OTEL_EXPORTER_OTLP_TIMEOUT"))
        {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                PulseError::Exporter(format!("invalid OTLP timeout '{raw}': {e}"))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let service_name =
            get("OTEL_SERVICE_NAME").unwrap_or_else(|| default_service_name.to_string());

        Ok(Self {
            endpoint,
            headers,
            timeout: Duration::from_millis(timeout_ms),
            service_name,
        })
    }
}

/// Parse `key1=value1,key2=value2`.
fn parse_headers(raw: &str) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').ok_or_else(|| {
            PulseError::Exporter(format!("OTLP header '{pair}' is not key=value"))
        })?;
        let name = HeaderName::from_bytes(k.trim().as_bytes()).map_err(|e| {
            PulseError::Exporter(format!("invalid OTLP header name '{k}': {e}"))
        })?;
        let value = HeaderValue::from_str(v.trim()).map_err(|e| {
            PulseError::Exporter(format!("invalid OTLP header value for '{k}': {e}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

pub struct OtlpHttpExporter {
    client: reqwest::Client,
    settings: OtlpSettings,
}

impl OtlpHttpExporter {
    pub fn new(settings: OtlpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(settings.headers.clone())
            .build()
            .map_err(|e| PulseError::Exporter(format!("build http client failed: {e}")))?;
        Ok(Self { client, settings })
    }

    pub fn endpoint(&self) -> &Url {
        &self.settings.endpoint
    }
}

#[async_trait]
impl SpanExporter for OtlpHttpExporter {
    async fn export(&self, batch: Vec<SpanRecord>) -> Result<()> {
        let body = encode_otlp_json(&self.settings.service_name, &batch)?;
        let resp = self
            .client
            .post(self.settings.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PulseError::Exporter(format!("send to collector failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PulseError::Exporter(format!("collector responded {status}")));
        }
        Ok(())
    }
}

/// Keeps every exported span. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SpanExporter for InMemoryExporter {
    async fn export(&self, batch: Vec<SpanRecord>) -> Result<()> {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(batch);
        Ok(())
    }
}

// --------------------
// OTLP/JSON wire shapes
// --------------------
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportTraceRequest<'a> {
    resource_spans: Vec<ResourceSpans<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceSpans<'a> {
    resource: Resource<'a>,
    scope_spans: Vec<ScopeSpans<'a>>,
}

#[derive(Serialize)]
struct Resource<'a> {
    attributes: Vec<KeyValue<'a>>,
}

#[derive(Serialize)]
struct ScopeSpans<'a> {
    scope: Scope<'a>,
    spans: Vec<OtlpSpan<'a>>,
}

#[derive(Serialize)]
struct Scope<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OtlpSpan<'a> {
    trace_id: &'a str,
    span_id: &'a str,
    name: &'a str,
    kind: u8,
    start_time_unix_nano: String,
    end_time_unix_nano: String,
    attributes: Vec<KeyValue<'a>>,
    status: Status<'a>,
}

#[derive(Serialize)]
struct KeyValue<'a> {
    key: &'a str,
    value: AnyValue<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnyValue<'a> {
    string_value: &'a str,
}

#[derive(Serialize)]
struct Status<'a> {
    code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

fn unix_nanos(t: std::time::SystemTime) -> String {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .to_string()
}

/// Encode one export request: a single resource, spans grouped by scope in
/// first-seen order.
pub fn encode_otlp_json(service_name: &str, spans: &[SpanRecord]) -> Result<Vec<u8>> {
    let mut scopes: Vec<ScopeSpans<'_>> = Vec::new();
    for s in spans {
        let status = match &s.status {
            SpanStatus::Unset => Status { code: 0, message: None },
            SpanStatus::Ok => Status { code: 1, message: None },
            SpanStatus::Error(m) => Status { code: 2, message: Some(m.as_str()) },
        };
        let span = OtlpSpan {
            trace_id: &s.trace_id,
            span_id: &s.span_id,
            name: &s.name,
            kind: s.kind.otlp_code(),
            start_time_unix_nano: unix_nanos(s.start),
            end_time_unix_nano: unix_nanos(s.end),
            attributes: s
                .attributes
                .iter()
                .map(|(k, v)| KeyValue { key: k, value: AnyValue { string_value: v } })
                .collect(),
            status,
        };
        match scopes.iter_mut().find(|g| g.scope.name == &*s.scope) {
            Some(group) => group.spans.push(span),
            None => scopes.push(ScopeSpans {
                scope: Scope { name: &s.scope },
                spans: vec![span],
            }),
        }
    }

    let req = ExportTraceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Resource {
                attributes: vec![KeyValue {
                    key: "service.name",
                    value: AnyValue { string_value: service_name },
                }],
            },
            scope_spans: scopes,
        }],
    };
    serde_json::to_vec(&req).map_err(|e| PulseError::Internal(format!("encode spans failed: {e}")))
}
