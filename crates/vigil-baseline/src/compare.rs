//! The three-phase semantic comparator.
//!
//! Phase 1 diffs the tool name sets; phase 2 diffs tools present in both
//! baselines (schema, response shape, error patterns, performance); phase 3
//! matches assertions by fingerprint. Severity aggregates as breaking >
//! warning > info > none.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use vigil_types::{
    BehavioralAssertion, BehavioralBaseline, BehavioralDiff, DiffSeverity,
    PerformanceConfidenceLevel, ToolChange, ToolFingerprint, ToolModification,
};

use crate::assertion::{assertion_fingerprint, match_confidence};

/// p95 regressions at or beyond this ratio are drift.
const P95_REGRESSION_RATIO: f64 = 1.5;

/// Success-rate drops (in absolute points) that warn / break.
const SUCCESS_DROP_WARNING: f64 = 0.10;
const SUCCESS_DROP_BREAKING: f64 = 0.25;

/// Compare two baselines and classify the drift.
pub fn diff_baselines(
    previous: &BehavioralBaseline,
    current: &BehavioralBaseline,
) -> BehavioralDiff {
    let mut breaking = 0usize;
    let mut warning = 0usize;
    let mut info = 0usize;

    // ── Phase 1: set diff of tool names ─────────────────────────────
    let previous_names: HashSet<&str> = previous.tools.iter().map(|t| t.name.as_str()).collect();
    let current_names: HashSet<&str> = current.tools.iter().map(|t| t.name.as_str()).collect();

    let mut tools_added: Vec<String> = current
        .tools
        .iter()
        .filter(|t| !previous_names.contains(t.name.as_str()))
        .map(|t| t.name.clone())
        .collect();
    let mut tools_removed: Vec<String> = previous
        .tools
        .iter()
        .filter(|t| !current_names.contains(t.name.as_str()))
        .map(|t| t.name.clone())
        .collect();
    tools_added.sort();
    tools_removed.sort();

    breaking += tools_removed.len();
    info += tools_added.len();

    // ── Phase 2: per-tool diff ──────────────────────────────────────
    let mut tools_modified: Vec<ToolModification> = Vec::new();
    for previous_tool in &previous.tools {
        let Some(current_tool) = current.tool(&previous_tool.name) else {
            continue;
        };
        let changes = diff_tool(previous_tool, current_tool);
        if changes.is_empty() {
            continue;
        }
        for change in &changes {
            match change.severity {
                DiffSeverity::Breaking => breaking += 1,
                DiffSeverity::Warning => warning += 1,
                DiffSeverity::Info => info += 1,
                DiffSeverity::None => {}
            }
        }
        tools_modified.push(ToolModification {
            tool: previous_tool.name.clone(),
            changes,
        });
    }

    // ── Phase 3: assertion diff by fingerprint ──────────────────────
    let (assertions_added, assertions_removed, polarity_flips) =
        diff_assertions(&previous.assertions, &current.assertions);
    info += assertions_added.len() + assertions_removed.len();
    warning += polarity_flips.len();
    for flip in polarity_flips {
        attach_change(&mut tools_modified, flip);
    }

    let severity = BehavioralDiff::aggregate_severity(breaking, warning, info);
    debug!(breaking, warning, info, severity = ?severity, "baselines compared");

    BehavioralDiff {
        tools_added,
        tools_removed,
        tools_modified,
        assertions_added,
        assertions_removed,
        severity,
        breaking_count: breaking,
        warning_count: warning,
        info_count: info,
    }
}

fn diff_tool(previous: &ToolFingerprint, current: &ToolFingerprint) -> Vec<ToolChange> {
    let mut changes = Vec::new();

    // Schema drift.
    if previous.schema_hash != current.schema_hash {
        let breaking_params = new_required_without_default(
            previous.input_schema.as_ref(),
            current.input_schema.as_ref(),
        );
        if breaking_params.is_empty() {
            changes.push(change(
                DiffSeverity::Warning,
                "input schema changed".to_string(),
            ));
        } else {
            changes.push(change(
                DiffSeverity::Breaking,
                format!(
                    "input schema added required parameter(s) without defaults: {}",
                    breaking_params.join(", ")
                ),
            ));
        }
    }

    // Response shape drift.
    if let (Some(prev_fp), Some(curr_fp)) =
        (&previous.response_fingerprint, &current.response_fingerprint)
    {
        if prev_fp.content_type != curr_fp.content_type {
            changes.push(change(
                DiffSeverity::Warning,
                format!(
                    "response content type changed: {:?} -> {:?}",
                    prev_fp.content_type, curr_fp.content_type
                ),
            ));
        }
        match (&prev_fp.fields, &curr_fp.fields) {
            (Some(prev_fields), Some(curr_fields)) => {
                let lost: Vec<&String> = prev_fields
                    .iter()
                    .filter(|f| !curr_fields.contains(f))
                    .collect();
                let gained: Vec<&String> = curr_fields
                    .iter()
                    .filter(|f| !prev_fields.contains(f))
                    .collect();
                if !lost.is_empty() {
                    changes.push(change(
                        DiffSeverity::Breaking,
                        format!(
                            "response fields disappeared: {}",
                            lost.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                        ),
                    ));
                }
                if !gained.is_empty() {
                    changes.push(change(
                        DiffSeverity::Info,
                        format!(
                            "response fields appeared: {}",
                            gained.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                        ),
                    ));
                }
            }
            _ => {}
        }
    }

    // Error pattern drift: compare the category sets.
    let prev_categories: HashSet<_> = previous
        .error_patterns
        .iter()
        .flatten()
        .map(|p| p.category)
        .collect();
    let curr_categories: HashSet<_> = current
        .error_patterns
        .iter()
        .flatten()
        .map(|p| p.category)
        .collect();
    for category in curr_categories.difference(&prev_categories) {
        changes.push(change(
            DiffSeverity::Warning,
            format!("new error category observed: {category:?}"),
        ));
    }
    for category in prev_categories.difference(&curr_categories) {
        changes.push(change(
            DiffSeverity::Info,
            format!("error category no longer observed: {category:?}"),
        ));
    }

    // Performance drift, only when both sides are trustworthy.
    if confident(previous) && confident(current) {
        if let (Some(prev_p95), Some(curr_p95)) =
            (previous.baseline_p95_ms, current.baseline_p95_ms)
        {
            if prev_p95 > 0.0 && curr_p95 / prev_p95 >= P95_REGRESSION_RATIO {
                changes.push(change(
                    DiffSeverity::Warning,
                    format!("p95 latency regressed: {prev_p95:.0}ms -> {curr_p95:.0}ms"),
                ));
            }
        }
    }
    if let (Some(prev_rate), Some(curr_rate)) =
        (previous.baseline_success_rate, current.baseline_success_rate)
    {
        let drop = prev_rate - curr_rate;
        if drop >= SUCCESS_DROP_BREAKING {
            changes.push(change(
                DiffSeverity::Breaking,
                format!(
                    "success rate dropped {:.0} points: {:.0}% -> {:.0}%",
                    drop * 100.0,
                    prev_rate * 100.0,
                    curr_rate * 100.0
                ),
            ));
        } else if drop >= SUCCESS_DROP_WARNING {
            changes.push(change(
                DiffSeverity::Warning,
                format!(
                    "success rate dropped {:.0} points: {:.0}% -> {:.0}%",
                    drop * 100.0,
                    prev_rate * 100.0,
                    curr_rate * 100.0
                ),
            ));
        }
    }

    changes
}

fn confident(tool: &ToolFingerprint) -> bool {
    tool.performance_confidence
        .as_ref()
        .is_some_and(|c| c.confidence_level >= PerformanceConfidenceLevel::Medium)
}

/// Required parameter names present in `current` but not `previous`, whose
/// property declares no default.
fn new_required_without_default(previous: Option<&Value>, current: Option<&Value>) -> Vec<String> {
    let required_of = |schema: Option<&Value>| -> Vec<String> {
        schema
            .and_then(|s| s.get("required"))
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let previous_required = required_of(previous);
    required_of(current)
        .into_iter()
        .filter(|name| !previous_required.contains(name))
        .filter(|name| {
            current
                .and_then(|s| s.get("properties"))
                .and_then(|p| p.get(name))
                .and_then(|p| p.get("default"))
                .is_none()
        })
        .collect()
}

/// Match assertions by fingerprint; returns (added, removed, polarity
/// flips as tool changes).
fn diff_assertions(
    previous: &[BehavioralAssertion],
    current: &[BehavioralAssertion],
) -> (
    Vec<BehavioralAssertion>,
    Vec<BehavioralAssertion>,
    Vec<(String, ToolChange)>,
) {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut flips = Vec::new();
    let mut matched_current: Vec<bool> = vec![false; current.len()];

    for prev in previous {
        let prev_fp = assertion_fingerprint(prev);
        let matched = current.iter().enumerate().find(|(idx, curr)| {
            !matched_current[*idx] && assertion_fingerprint(curr) == prev_fp
        });
        match matched {
            Some((idx, curr)) => {
                matched_current[idx] = true;
                let confidence = match_confidence(prev, curr);
                debug!(
                    tool = %prev.tool,
                    confidence,
                    "assertion matched by fingerprint"
                );
                if prev.is_positive != curr.is_positive {
                    flips.push((
                        prev.tool.clone(),
                        change(
                            DiffSeverity::Warning,
                            format!("assertion polarity flipped: {}", prev.assertion),
                        ),
                    ));
                }
            }
            None => removed.push(prev.clone()),
        }
    }

    for (idx, curr) in current.iter().enumerate() {
        if !matched_current[idx] {
            added.push(curr.clone());
        }
    }

    (added, removed, flips)
}

fn attach_change(modifications: &mut Vec<ToolModification>, (tool, change): (String, ToolChange)) {
    match modifications.iter_mut().find(|m| m.tool == tool) {
        Some(existing) => existing.changes.push(change),
        None => modifications.push(ToolModification {
            tool,
            changes: vec![change],
        }),
    }
}

fn change(severity: DiffSeverity, description: String) -> ToolChange {
    ToolChange {
        description,
        severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use vigil_types::{
        AssertionAspect, ContentType, ErrorPattern, ErrorPatternCategory, PerformanceConfidence,
        ResponseFingerprint, ServerIdentity, SizeBucket,
    };

    fn tool(name: &str) -> ToolFingerprint {
        ToolFingerprint {
            name: name.into(),
            description: String::new(),
            input_schema: None,
            schema_hash: "same".into(),
            assertions: vec![],
            security_notes: vec![],
            limitations: vec![],
            response_fingerprint: None,
            inferred_output_schema: None,
            error_patterns: None,
            baseline_p50_ms: None,
            baseline_p95_ms: None,
            baseline_p99_ms: None,
            baseline_success_rate: None,
            performance_confidence: None,
        }
    }

    fn baseline(tools: Vec<ToolFingerprint>) -> BehavioralBaseline {
        let assertions = tools
            .iter()
            .flat_map(|t| t.assertions.iter().cloned())
            .collect();
        BehavioralBaseline {
            version: BehavioralBaseline::CURRENT_VERSION.into(),
            created_at: Utc::now(),
            server_command: "cmd".into(),
            server: ServerIdentity {
                name: "demo".into(),
                version: "1".into(),
                protocol_version: "2024-11-05".into(),
                capabilities: vec![],
            },
            tools,
            summary: String::new(),
            assertions,
            workflow_signatures: None,
            acceptance: None,
            integrity_hash: String::new(),
        }
    }

    fn fingerprint(content_type: ContentType, fields: Option<Vec<&str>>) -> ResponseFingerprint {
        ResponseFingerprint {
            structure_hash: "h".into(),
            content_type,
            fields: fields.map(|f| f.iter().map(|s| s.to_string()).collect()),
            array_item_structure: None,
            size: SizeBucket::Small,
            is_empty: false,
            sample_count: 3,
            confidence: 0.9,
        }
    }

    fn confident(level: PerformanceConfidenceLevel) -> Option<PerformanceConfidence> {
        Some(PerformanceConfidence {
            sample_count: 10,
            standard_deviation: 1.0,
            coefficient_of_variation: 0.1,
            confidence_level: level,
            recommendation: None,
        })
    }

    #[test]
    fn identical_baselines_have_no_drift() {
        let a = baseline(vec![tool("echo"), tool("search")]);
        let diff = diff_baselines(&a, &a);
        assert_eq!(diff.severity, DiffSeverity::None);
        assert_eq!(diff.breaking_count, 0);
        assert_eq!(diff.warning_count, 0);
        assert_eq!(diff.info_count, 0);
        assert!(!diff.has_drift());
    }

    #[test]
    fn removed_tool_is_breaking() {
        // Two baselines differing only by a removed tool "delete_user".
        let previous = baseline(vec![tool("delete_user"), tool("echo")]);
        let current = baseline(vec![tool("echo")]);
        let diff = diff_baselines(&previous, &current);
        assert_eq!(diff.tools_removed, vec!["delete_user"]);
        assert_eq!(diff.breaking_count, 1);
        assert_eq!(diff.severity, DiffSeverity::Breaking);
    }

    #[test]
    fn added_tool_is_info() {
        let previous = baseline(vec![tool("echo")]);
        let current = baseline(vec![tool("echo"), tool("search")]);
        let diff = diff_baselines(&previous, &current);
        assert_eq!(diff.tools_added, vec!["search"]);
        assert_eq!(diff.severity, DiffSeverity::Info);
    }

    #[test]
    fn schema_change_is_warning_by_default() {
        let mut previous_tool = tool("echo");
        previous_tool.schema_hash = "a".into();
        let mut current_tool = tool("echo");
        current_tool.schema_hash = "b".into();
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Warning);
    }

    #[test]
    fn new_required_parameter_without_default_is_breaking() {
        let mut previous_tool = tool("echo");
        previous_tool.schema_hash = "a".into();
        previous_tool.input_schema = Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }));
        let mut current_tool = tool("echo");
        current_tool.schema_hash = "b".into();
        current_tool.input_schema = Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}, "mode": {"type": "string"}},
            "required": ["text", "mode"]
        }));
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Breaking);
        assert!(diff.tools_modified[0].changes[0]
            .description
            .contains("mode"));
    }

    #[test]
    fn new_required_parameter_with_default_stays_warning() {
        let mut previous_tool = tool("echo");
        previous_tool.schema_hash = "a".into();
        previous_tool.input_schema = Some(json!({"required": ["text"]}));
        let mut current_tool = tool("echo");
        current_tool.schema_hash = "b".into();
        current_tool.input_schema = Some(json!({
            "properties": {"mode": {"type": "string", "default": "fast"}},
            "required": ["text", "mode"]
        }));
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Warning);
    }

    #[test]
    fn content_type_change_warns_and_field_shrink_breaks() {
        let mut previous_tool = tool("echo");
        previous_tool.response_fingerprint =
            Some(fingerprint(ContentType::Object, Some(vec!["id", "name"])));
        let mut current_tool = tool("echo");
        current_tool.response_fingerprint =
            Some(fingerprint(ContentType::Object, Some(vec!["id"])));
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Breaking);
        assert!(diff.tools_modified[0]
            .changes
            .iter()
            .any(|c| c.description.contains("disappeared")));
    }

    #[test]
    fn field_growth_is_info() {
        let mut previous_tool = tool("echo");
        previous_tool.response_fingerprint =
            Some(fingerprint(ContentType::Object, Some(vec!["id"])));
        let mut current_tool = tool("echo");
        current_tool.response_fingerprint =
            Some(fingerprint(ContentType::Object, Some(vec!["id", "extra"])));
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Info);
    }

    #[test]
    fn new_error_category_warns_disappeared_informs() {
        let pattern = |category| ErrorPattern {
            category,
            pattern_hash: "p".into(),
            example: "e".into(),
            count: 1,
        };
        let mut previous_tool = tool("echo");
        previous_tool.error_patterns = Some(vec![pattern(ErrorPatternCategory::Validation)]);
        let mut current_tool = tool("echo");
        current_tool.error_patterns = Some(vec![pattern(ErrorPatternCategory::Internal)]);
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.warning_count, 1);
        assert_eq!(diff.info_count, 1);
        assert_eq!(diff.severity, DiffSeverity::Warning);
    }

    #[test]
    fn p95_regression_needs_confidence_on_both_sides() {
        let mut previous_tool = tool("echo");
        previous_tool.baseline_p95_ms = Some(100.0);
        previous_tool.performance_confidence = confident(PerformanceConfidenceLevel::High);
        let mut current_tool = tool("echo");
        current_tool.baseline_p95_ms = Some(200.0);
        current_tool.performance_confidence = confident(PerformanceConfidenceLevel::Low);
        let diff = diff_baselines(
            &baseline(vec![previous_tool.clone()]),
            &baseline(vec![current_tool.clone()]),
        );
        assert_eq!(diff.severity, DiffSeverity::None);

        current_tool.performance_confidence = confident(PerformanceConfidenceLevel::Medium);
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Warning);
    }

    #[test]
    fn success_rate_drop_tiers() {
        let mut previous_tool = tool("echo");
        previous_tool.baseline_success_rate = Some(0.95);
        let mut warn_tool = tool("echo");
        warn_tool.baseline_success_rate = Some(0.80);
        let diff = diff_baselines(
            &baseline(vec![previous_tool.clone()]),
            &baseline(vec![warn_tool]),
        );
        assert_eq!(diff.severity, DiffSeverity::Warning);

        let mut broken_tool = tool("echo");
        broken_tool.baseline_success_rate = Some(0.60);
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![broken_tool]));
        assert_eq!(diff.severity, DiffSeverity::Breaking);
    }

    #[test]
    fn whitespace_only_assertion_change_is_no_drift() {
        let assertion = |text: &str| BehavioralAssertion {
            tool: "echo".into(),
            aspect: AssertionAspect::ResponseFormat,
            assertion: text.into(),
            evidence: None,
            is_positive: true,
        };
        let mut previous_tool = tool("echo");
        previous_tool.assertions = vec![assertion("returns  json on empty input")];
        let mut current_tool = tool("echo");
        current_tool.assertions = vec![assertion("returns json on  empty input")];
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::None);
    }

    #[test]
    fn polarity_flip_is_warning() {
        let assertion = |positive: bool| BehavioralAssertion {
            tool: "echo".into(),
            aspect: AssertionAspect::Security,
            assertion: "sanitizes suspicious input".into(),
            evidence: None,
            is_positive: positive,
        };
        let mut previous_tool = tool("echo");
        previous_tool.assertions = vec![assertion(true)];
        let mut current_tool = tool("echo");
        current_tool.assertions = vec![assertion(false)];
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.severity, DiffSeverity::Warning);
        assert!(diff.tools_modified[0].changes[0]
            .description
            .contains("polarity"));
    }

    #[test]
    fn unmatched_assertions_are_info() {
        let make = |text: &str| BehavioralAssertion {
            tool: "echo".into(),
            aspect: AssertionAspect::ResponseFormat,
            assertion: text.into(),
            evidence: None,
            is_positive: true,
        };
        let mut previous_tool = tool("echo");
        previous_tool.assertions = vec![make("returns json")];
        let mut current_tool = tool("echo");
        current_tool.assertions = vec![make("rejects malformed input with error")];
        let diff = diff_baselines(&baseline(vec![previous_tool]), &baseline(vec![current_tool]));
        assert_eq!(diff.assertions_added.len(), 1);
        assert_eq!(diff.assertions_removed.len(), 1);
        assert_eq!(diff.severity, DiffSeverity::Info);
    }
}
