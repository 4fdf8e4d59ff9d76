//! Structured view over one raw cluster response.
//!
//! # Design
//! The body is parsed as JSON once, at construction. Bodies that are not JSON
//! are kept as `{"message": <raw body>}` so callers always get an object.
//! An empty body parses to an empty object.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::HttpMethod;

/// Transfer metadata recorded by the transport in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferInfo {
    pub url: String,
    pub method: HttpMethod,
    /// HTTP status, 0 when the exchange never got a response.
    pub http_code: u16,
    /// Seconds spent on the exchange.
    pub total_time: f64,
    pub size_upload: usize,
    pub size_download: usize,
    pub content_type: Option<String>,
    /// Whether a cached persistent handle served the exchange.
    pub handle_reused: bool,
}

#[derive(Debug, Clone)]
pub struct Response {
    body: Vec<u8>,
    status: u16,
    data: Value,
    query_time: Option<Duration>,
    transfer_info: Option<TransferInfo>,
}

impl Response {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let data = parse_body(&body);
        Self {
            body,
            status: 0,
            data,
            query_time: None,
            transfer_info: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// HTTP status, or 0 when no HTTP response was received.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// True when the body carries a non-null `error` field or the status is 5xx.
    pub fn has_error(&self) -> bool {
        let body_error = self.data.get("error").is_some_and(|e| !e.is_null());
        body_error || (500..600).contains(&self.status)
    }

    /// Error message reported by the cluster, if any.
    ///
    /// Structured errors (`{"error": {"type": .., "reason": ..}}`) are
    /// rendered as `type: reason`.
    pub fn error(&self) -> Option<String> {
        match self.data.get("error")? {
            Value::Null => None,
            Value::String(message) => Some(message.clone()),
            Value::Object(details) => {
                let kind = details.get("type").and_then(Value::as_str);
                let reason = details.get("reason").and_then(Value::as_str);
                match (kind, reason) {
                    (Some(kind), Some(reason)) => Some(format!("{kind}: {reason}")),
                    (Some(text), None) | (None, Some(text)) => Some(text.to_string()),
                    (None, None) => Some(Value::Object(details.clone()).to_string()),
                }
            }
            other => Some(other.to_string()),
        }
    }

    pub(crate) fn error_summary(&self) -> String {
        self.error().unwrap_or_else(|| format!("HTTP {}", self.status))
    }

    /// Whether the cluster acknowledged the operation.
    pub fn is_ok(&self) -> bool {
        let flag = |key: &str| self.data.get(key).and_then(Value::as_bool);
        if let Some(ok) = flag("ok").or_else(|| flag("acknowledged")) {
            return ok;
        }
        (200..300).contains(&self.status) && !self.has_error()
    }

    /// Time the cluster spent on the request (`took`), in milliseconds.
    pub fn engine_time(&self) -> Option<u64> {
        self.data.get("took").and_then(Value::as_u64)
    }

    pub fn shards_statistics(&self) -> Option<&Map<String, Value>> {
        self.data.get("_shards").and_then(Value::as_object)
    }

    pub fn query_time(&self) -> Option<Duration> {
        self.query_time
    }

    pub fn set_query_time(&mut self, elapsed: Duration) -> &mut Self {
        self.query_time = Some(elapsed);
        self
    }

    pub fn transfer_info(&self) -> Option<&TransferInfo> {
        self.transfer_info.as_ref()
    }

    pub fn set_transfer_info(&mut self, info: TransferInfo) -> &mut Self {
        self.transfer_info = Some(info);
        self
    }
}

fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            let mut map = Map::new();
            map.insert(
                "message".to_string(),
                Value::String(String::from_utf8_lossy(body).into_owned()),
            );
            Value::Object(map)
        }
    }
}
