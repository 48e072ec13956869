//! Transport error types.

use thiserror::Error;
use vigil_types::TransportErrorCategory;

use crate::jsonrpc::JsonRpcError;

/// Errors from the framed JSON-RPC transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server process could not be spawned.
    #[error("failed to spawn server process: {0}")]
    Spawn(String),

    /// The connection to the server failed or was refused.
    #[error("connection failed: {0}")]
    Connection(String),

    /// No reply arrived within the request deadline. The connection stays
    /// live; only this request is abandoned.
    #[error("request '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: String,
        timeout_ms: u64,
    },

    /// A stdout line was not valid JSON.
    #[error("server emitted invalid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON that violates the JSON-RPC envelope.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The server answered the request with a JSON-RPC error object.
    #[error("server error: {0}")]
    Rpc(JsonRpcError),

    /// The transport was closed while the request was pending.
    #[error("cancelled")]
    Cancelled,

    /// Underlying I/O failure on the transport streams.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of an outbound frame failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    /// Map onto the recorded failure taxonomy.
    pub fn category(&self) -> TransportErrorCategory {
        match self {
            Self::Spawn(_) => TransportErrorCategory::ProcessSpawn,
            Self::Connection(_) | Self::Io(_) => TransportErrorCategory::ConnectionRefused,
            Self::Timeout { .. } => TransportErrorCategory::Timeout,
            Self::InvalidJson(_) => TransportErrorCategory::InvalidJson,
            Self::Protocol(_) | Self::Rpc(_) | Self::Json(_) => {
                TransportErrorCategory::ProtocolError
            }
            Self::Cancelled => TransportErrorCategory::Cancelled,
        }
    }
}

/// A convenience type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
