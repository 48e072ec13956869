//! HTTP transport: the same JSON-RPC envelope carried in chunked POSTs.
//!
//! Each request is one HTTP POST to the endpoint. Replies come back either
//! as a plain JSON body or as a short server-sent-event stream whose
//! `data:` lines carry the JSON-RPC frames; both are accepted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use vigil_types::{TransportErrorCategory, TransportErrorRecord};

use crate::client::McpTransport;
use crate::connection::ErrorLog;
use crate::error::{Result, TransportError};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

/// A JSON-RPC transport over a remote HTTP endpoint.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    errors: ErrorLog,
}

impl HttpTransport {
    /// Point the transport at an endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
            errors: ErrorLog::default(),
        }
    }

    fn classify(&self, err: &reqwest::Error, operation: &str) -> TransportError {
        if err.is_timeout() {
            return TransportError::Timeout {
                operation: operation.to_string(),
                timeout_ms: 0,
            };
        }
        TransportError::Connection(err.to_string())
    }

    /// Pull the matching JSON-RPC frame out of a reply body.
    ///
    /// SSE bodies are scanned `data:` line by line; plain bodies parse
    /// directly.
    fn parse_body(&self, body: &str, is_event_stream: bool, id: u64) -> Result<JsonRpcResponse> {
        if is_event_stream {
            for line in body.lines() {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }
                let frame: Value = serde_json::from_str(data).map_err(|e| {
                    self.errors.record(
                        TransportErrorRecord::new(
                            TransportErrorCategory::InvalidJson,
                            "read",
                            format!("event data is not JSON: {e}"),
                        )
                        .with_raw(data),
                    );
                    TransportError::InvalidJson(data.to_string())
                })?;
                if frame.get("id").and_then(Value::as_u64) == Some(id) {
                    return serde_json::from_value(frame).map_err(|e| {
                        TransportError::Protocol(format!("malformed reply envelope: {e}"))
                    });
                }
                trace!(frame = %frame, "skipping uncorrelated event frame");
            }
            return Err(TransportError::Protocol(format!(
                "event stream ended without a reply for id {id}"
            )));
        }

        serde_json::from_str(body).map_err(|e| {
            self.errors.record(
                TransportErrorRecord::new(
                    TransportErrorCategory::InvalidJson,
                    "read",
                    format!("reply body is not JSON: {e}"),
                )
                .with_raw(body),
            );
            TransportError::InvalidJson(body.to_string())
        })
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value, timeout_ms: u64) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = JsonRpcRequest::new(id, method, params);
        debug!(url = %self.url, method, id, "http request");

        let response = self
            .http
            .post(&self.url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .json(&frame)
            .send()
            .await
            .map_err(|e| {
                let err = self.classify(&e, method);
                self.errors.record(TransportErrorRecord::new(
                    err.category(),
                    method,
                    err.to_string(),
                ));
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = TransportError::Connection(format!("HTTP {status}"));
            self.errors.record(TransportErrorRecord::new(
                TransportErrorCategory::ConnectionRefused,
                method,
                err.to_string(),
            ));
            return Err(err);
        }

        let is_event_stream = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let parsed = self.parse_body(&body, is_event_stream, id)?;
        if let Some(rpc_err) = parsed.error {
            return Err(TransportError::Rpc(rpc_err));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        let frame = JsonRpcRequest::notification(method, params);
        self.http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&frame)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(())
    }

    fn transport_errors(&self) -> Vec<TransportErrorRecord> {
        self.errors.snapshot()
    }

    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn close(&self) {}
}
