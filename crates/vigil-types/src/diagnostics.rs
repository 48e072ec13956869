//! Transport error records and discovery warnings.
//!
//! These are *observations*, not control-flow errors: the transport and the
//! discovery pass record them as they go, and they end up in the baseline
//! summary so drift in a server's failure behavior is visible too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorCategory {
    /// A stdout line failed to parse as JSON. Almost always a server bug.
    InvalidJson,
    /// The remote endpoint refused the connection.
    ConnectionRefused,
    /// The child process could not be spawned.
    ProcessSpawn,
    /// No reply arrived within the request deadline.
    Timeout,
    /// Valid JSON that violates the JSON-RPC envelope.
    ProtocolError,
    /// The request was abandoned because the transport was closed.
    Cancelled,
}

impl TransportErrorCategory {
    /// Whether a failure of this class may succeed on retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionRefused)
    }

    /// Whether this failure points at a bug in the server under test rather
    /// than the environment.
    pub fn is_likely_server_bug(self) -> bool {
        matches!(self, Self::InvalidJson | Self::ProtocolError)
    }
}

impl std::fmt::Display for TransportErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidJson => "invalid_json",
            Self::ConnectionRefused => "connection_refused",
            Self::ProcessSpawn => "process_spawn",
            Self::Timeout => "timeout",
            Self::ProtocolError => "protocol_error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One recorded transport failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportErrorRecord {
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
    /// Failure class.
    pub category: TransportErrorCategory,
    /// Human-readable description.
    pub message: String,
    /// The offending raw payload, if one exists (e.g. the unparseable line).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
    /// The JSON-RPC method or lifecycle step in flight.
    pub operation: String,
    /// Whether the failure points at the server rather than the environment.
    pub likely_server_bug: bool,
}

impl TransportErrorRecord {
    /// Record a failure observed now.
    pub fn new(
        category: TransportErrorCategory,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            message: message.into(),
            raw_error: None,
            operation: operation.into(),
            likely_server_bug: category.is_likely_server_bug(),
        }
    }

    /// Attach the raw payload that triggered the failure.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_error = Some(raw.into());
        self
    }
}

/// Severity of a discovery warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    Info,
    Warning,
}

/// An anomaly noticed during capability discovery.
///
/// Example: a server that advertises the `tools` capability but returns an
/// empty tool list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryWarning {
    pub level: WarningLevel,
    pub message: String,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_is_server_bug() {
        let rec = TransportErrorRecord::new(
            TransportErrorCategory::InvalidJson,
            "tools/list",
            "line 3 is not JSON",
        );
        assert!(rec.likely_server_bug);
    }

    #[test]
    fn spawn_failure_is_not_server_bug() {
        let rec =
            TransportErrorRecord::new(TransportErrorCategory::ProcessSpawn, "spawn", "ENOENT");
        assert!(!rec.likely_server_bug);
    }

    #[test]
    fn timeout_is_retryable_protocol_error_is_not() {
        assert!(TransportErrorCategory::Timeout.is_retryable());
        assert!(!TransportErrorCategory::ProtocolError.is_retryable());
    }

    #[test]
    fn serde_uses_snake_case_categories() {
        let json = serde_json::to_string(&TransportErrorCategory::InvalidJson).unwrap();
        assert_eq!(json, r#""invalid_json""#);
    }

    #[test]
    fn raw_error_omitted_when_absent() {
        let rec = TransportErrorRecord::new(TransportErrorCategory::Timeout, "tools/call", "slow");
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("rawError"));
        let with_raw = rec.with_raw("garbage");
        let json = serde_json::to_string(&with_raw).unwrap();
        assert!(json.contains("rawError"));
    }
}
