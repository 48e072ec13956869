//! Framed JSON-RPC transport and capability discovery.
//!
//! Talks to a tool-exposing server over newline-delimited JSON-RPC, either
//! through a spawned child process ([`StdioTransport`]) or a remote HTTP
//! endpoint ([`HttpTransport`]). Both drivers share the same envelope and
//! correlation rules; the stdio framing core is generic over
//! `AsyncRead`/`AsyncWrite` so it can be exercised against in-memory pipes.
//!
//! On top of the transport, [`McpClient`] exposes the protocol surface this
//! system consumes (`initialize`, `tools/list`, `prompts/list`,
//! `resources/list`, `tools/call`) and [`discover`] runs the capability
//! discovery pass, collecting anomaly warnings and transport errors.

pub mod client;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod http;
pub mod jsonrpc;
pub mod stdio;

pub use client::{InitializeResult, McpClient, McpTransport, ServerCapabilities, ToolCallResult};
pub use connection::Connection;
pub use discovery::{discover, DiscoveryResult};
pub use error::{Result, TransportError};
pub use http::HttpTransport;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
pub use stdio::StdioTransport;
