//! Semantic diff between two behavioral baselines.

use serde::{Deserialize, Serialize};

use crate::baseline::BehavioralAssertion;

/// Severity of a diff or of one change within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSeverity {
    None,
    Info,
    Warning,
    Breaking,
}

/// One detected change on a tool present in both baselines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolChange {
    /// What changed, in prose.
    pub description: String,
    pub severity: DiffSeverity,
}

/// All changes detected on one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolModification {
    pub tool: String,
    pub changes: Vec<ToolChange>,
}

/// The semantic diff between a previous and a current baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralDiff {
    pub tools_added: Vec<String>,
    pub tools_removed: Vec<String>,
    pub tools_modified: Vec<ToolModification>,
    pub assertions_added: Vec<BehavioralAssertion>,
    pub assertions_removed: Vec<BehavioralAssertion>,
    pub severity: DiffSeverity,
    pub breaking_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl BehavioralDiff {
    /// An empty diff (identical baselines).
    pub fn empty() -> Self {
        Self {
            tools_added: Vec::new(),
            tools_removed: Vec::new(),
            tools_modified: Vec::new(),
            assertions_added: Vec::new(),
            assertions_removed: Vec::new(),
            severity: DiffSeverity::None,
            breaking_count: 0,
            warning_count: 0,
            info_count: 0,
        }
    }

    /// Whether any drift was detected at all.
    pub fn has_drift(&self) -> bool {
        self.severity != DiffSeverity::None
    }

    /// Derive the aggregate severity from the counters.
    ///
    /// `breaking` wins over `warning` wins over `info`; all-zero means
    /// `none`.
    pub fn aggregate_severity(breaking: usize, warning: usize, info: usize) -> DiffSeverity {
        if breaking > 0 {
            DiffSeverity::Breaking
        } else if warning > 0 {
            DiffSeverity::Warning
        } else if info > 0 {
            DiffSeverity::Info
        } else {
            DiffSeverity::None
        }
    }
}
