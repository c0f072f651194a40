use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Canonical per-stream view of one inbound request. Owned by a single stream
/// controller and dropped with it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestContext {
    /// Forwarded headers, lower-cased keys, reserved keys already stripped
    pub headers: HashMap<String, String>,
    /// Decoded JSON body; `None` until the body phase completes
    pub body: Option<Map<String, Value>>,
    pub fairness_id: String,
    pub stream_requested: bool,
    pub request_id: Option<String>,
    pub model: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub headers_processed: bool,
    pub body_processed: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn prompt(&self) -> Option<&Value> {
        self.body
            .as_ref()
            .and_then(|body| body.get(crate::metadata::body::PROMPT))
    }
}
