//! The protocol client: the methods this system consumes from a server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use vigil_types::{ToolDescriptor, TransportErrorRecord};

use crate::error::{Result, TransportError};

/// Protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// A pluggable framing driver. [`StdioTransport`](crate::StdioTransport)
/// and [`HttpTransport`](crate::HttpTransport) implement this; tests supply
/// scripted fakes.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and await its correlated reply.
    async fn request(&self, method: &str, params: Value, timeout_ms: u64) -> Result<Value>;

    /// Send a fire-and-forget notification.
    async fn notify(&self, method: &str, params: Value) -> Result<()>;

    /// All transport failures recorded so far.
    fn transport_errors(&self) -> Vec<TransportErrorRecord>;

    /// Human-readable identity of the endpoint (command line or URL).
    fn describe(&self) -> String;

    /// Shut the transport down, draining pending requests.
    async fn close(&self);
}

/// Capabilities advertised in the `initialize` reply.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub prompts: Option<Value>,
    #[serde(default)]
    pub resources: Option<Value>,
}

impl ServerCapabilities {
    /// Names of the advertised capabilities, in protocol order.
    pub fn advertised(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.tools.is_some() {
            names.push("tools".to_string());
        }
        if self.prompts.is_some() {
            names.push("prompts".to_string());
        }
        if self.resources.is_some() {
            names.push("resources".to_string());
        }
        names
    }
}

/// The server identity block of the `initialize` reply.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// The `initialize` reply.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    #[serde(default)]
    pub server_info: ServerInfo,
}

/// The `tools/call` reply.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolCallResult {
    /// Collapse the reply into a single JSON value for fingerprinting.
    ///
    /// Structured content wins; otherwise text blocks are joined; anything
    /// else keeps the raw content array.
    pub fn response_value(&self) -> Value {
        if let Some(structured) = &self.structured_content {
            return structured.clone();
        }
        if self.content.is_empty() {
            return Value::Null;
        }
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| {
                (block.get("type")?.as_str()? == "text")
                    .then(|| block.get("text")?.as_str())
                    .flatten()
            })
            .collect();
        if texts.len() == self.content.len() {
            return Value::String(texts.join("\n"));
        }
        Value::Array(self.content.clone())
    }

    /// Joined text of any text blocks, for error reporting.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Client over any [`McpTransport`], issuing the protocol methods this
/// system consumes.
pub struct McpClient {
    transport: Box<dyn McpTransport>,
    timeout_ms: u64,
}

impl McpClient {
    /// Wrap a transport with the default request deadline.
    pub fn new(transport: Box<dyn McpTransport>) -> Self {
        Self::with_timeout(transport, DEFAULT_TIMEOUT_MS)
    }

    /// Wrap a transport with an explicit request deadline.
    pub fn with_timeout(transport: Box<dyn McpTransport>, timeout_ms: u64) -> Self {
        Self {
            transport,
            timeout_ms,
        }
    }

    /// Perform the `initialize` handshake and acknowledge it.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "vigil",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let raw = self
            .transport
            .request("initialize", params, self.timeout_ms)
            .await?;
        let init: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| TransportError::Protocol(format!("malformed initialize reply: {e}")))?;
        debug!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "initialized"
        );
        self.transport
            .notify("notifications/initialized", json!({}))
            .await?;
        Ok(init)
    }

    /// Enumerate the server's tools.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let raw = self
            .transport
            .request("tools/list", json!({}), self.timeout_ms)
            .await?;
        let tools = raw.get("tools").cloned().unwrap_or(Value::Array(vec![]));
        serde_json::from_value(tools)
            .map_err(|e| TransportError::Protocol(format!("malformed tools/list reply: {e}")))
    }

    /// Enumerate the server's prompts.
    pub async fn list_prompts(&self) -> Result<Vec<Value>> {
        self.list_plural("prompts/list", "prompts").await
    }

    /// Enumerate the server's resources.
    pub async fn list_resources(&self) -> Result<Vec<Value>> {
        self.list_plural("resources/list", "resources").await
    }

    async fn list_plural(&self, method: &str, key: &str) -> Result<Vec<Value>> {
        let raw = self
            .transport
            .request(method, json!({}), self.timeout_ms)
            .await?;
        Ok(raw
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Invoke a tool with its own deadline.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        timeout_ms: u64,
    ) -> Result<ToolCallResult> {
        let params = json!({ "name": name, "arguments": arguments });
        let raw = self
            .transport
            .request("tools/call", params, timeout_ms)
            .await?;
        serde_json::from_value(raw)
            .map_err(|e| TransportError::Protocol(format!("malformed tools/call reply: {e}")))
    }

    /// All transport failures recorded so far.
    pub fn transport_errors(&self) -> Vec<TransportErrorRecord> {
        self.transport.transport_errors()
    }

    /// The endpoint identity (command line or URL).
    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    /// The default per-request deadline.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Shut the transport down.
    pub async fn close(&self) {
        self.transport.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capabilities_advertised_in_order() {
        let caps: ServerCapabilities =
            serde_json::from_value(json!({"resources": {}, "tools": {"listChanged": true}}))
                .unwrap();
        assert_eq!(caps.advertised(), vec!["tools", "resources"]);
    }

    #[test]
    fn response_value_prefers_structured_content() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "{\"a\":1}"}],
            "structuredContent": {"a": 1}
        }))
        .unwrap();
        assert_eq!(result.response_value(), json!({"a": 1}));
    }

    #[test]
    fn response_value_joins_text_blocks() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "text", "text": "line two"}
            ]
        }))
        .unwrap();
        assert_eq!(result.response_value(), json!("line one\nline two"));
    }

    #[test]
    fn response_value_empty_content_is_null() {
        let result = ToolCallResult::default();
        assert_eq!(result.response_value(), Value::Null);
    }

    #[test]
    fn response_value_mixed_content_keeps_array() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "caption"},
                {"type": "image", "data": "...", "mimeType": "image/png"}
            ]
        }))
        .unwrap();
        assert!(result.response_value().is_array());
    }

    #[test]
    fn is_error_flag_deserializes() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "boom"}],
            "isError": true
        }))
        .unwrap();
        assert!(result.is_error);
        assert_eq!(result.text(), "boom");
    }
}
