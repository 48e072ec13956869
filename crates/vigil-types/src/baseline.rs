//! The behavioral baseline: a versioned, hash-sealed snapshot of a server's
//! observable behavior over one interview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::{ErrorPattern, InferredSchema, PerformanceConfidence, ResponseFingerprint};
use crate::diff::BehavioralDiff;

/// A tool as advertised by the server's `tools/list` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-Schema subset describing the tool's parameters.
    pub input_schema: Value,
}

/// The behavioral aspect an assertion speaks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionAspect {
    ResponseFormat,
    ResponseStructure,
    ErrorHandling,
    ErrorPattern,
    Security,
    Performance,
    Schema,
    Description,
}

impl AssertionAspect {
    /// Stable string form, used inside assertion fingerprints.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResponseFormat => "response_format",
            Self::ResponseStructure => "response_structure",
            Self::ErrorHandling => "error_handling",
            Self::ErrorPattern => "error_pattern",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Schema => "schema",
            Self::Description => "description",
        }
    }
}

/// One free-text claim about a tool's behavior, with polarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralAssertion {
    /// The tool the claim is about.
    pub tool: String,
    /// Which behavioral aspect the claim covers.
    pub aspect: AssertionAspect,
    /// The claim itself.
    pub assertion: String,
    /// Supporting evidence, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// True for a positive capability, false for a limitation or risk.
    pub is_positive: bool,
}

/// Per-tool summary packaged into the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFingerprint {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Hash over the canonical input schema.
    pub schema_hash: String,
    pub assertions: Vec<BehavioralAssertion>,
    pub security_notes: Vec<String>,
    pub limitations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_fingerprint: Option<ResponseFingerprint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_output_schema: Option<InferredSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_patterns: Option<Vec<ErrorPattern>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_p50_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_p95_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_p99_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_confidence: Option<PerformanceConfidence>,
}

/// Identity of the interviewed server as reported by `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: Vec<String>,
}

/// Record of a human accepting a known diff against this baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineAcceptance {
    pub accepted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub accepted_diff: BehavioralDiff,
}

/// A versioned, hash-sealed snapshot of a server's observable behavior.
///
/// Write-once: once sealed and saved, any mutation invalidates
/// `integrity_hash` and loaders reject the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralBaseline {
    /// Format version (semver); drives forward migration on load.
    pub version: String,
    pub created_at: DateTime<Utc>,
    /// The command or URL the server was reached through.
    pub server_command: String,
    pub server: ServerIdentity,
    pub tools: Vec<ToolFingerprint>,
    /// Human-readable interview summary, including any short-circuited tools.
    pub summary: String,
    /// Cross-tool assertions (tool-level ones live on the fingerprints).
    pub assertions: Vec<BehavioralAssertion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_signatures: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<BaselineAcceptance>,
    /// SHA-256 prefix over the canonical encoding of everything above.
    pub integrity_hash: String,
}

impl BehavioralBaseline {
    /// The current baseline format version.
    pub const CURRENT_VERSION: &'static str = "2.1.0";

    /// Find a tool fingerprint by name.
    pub fn tool(&self, name: &str) -> Option<&ToolFingerprint> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// All tool names, in baseline order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}
