//! Assemble interview results into a sealed baseline.

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use vigil_analysis::{fingerprint_samples, group_error_patterns, infer_schema, ResponseSample};
use vigil_analysis::compute_performance;
use vigil_types::{
    canonical_json, sha256_hex_prefix, AssertionAspect, BehavioralAssertion, BehavioralBaseline,
    DiscoveryWarning, LatencySample, ServerIdentity, ToolDescriptor, ToolFingerprint, ToolProfile,
};

use crate::error::Result;
use crate::integrity::seal;

/// Hex length of a tool input-schema hash.
const SCHEMA_HASH_LEN: usize = 16;

/// Everything the builder needs from discovery and the interview.
pub struct BaselineInputs<'a> {
    pub server: ServerIdentity,
    pub server_command: String,
    pub descriptors: &'a [ToolDescriptor],
    pub profiles: &'a [ToolProfile],
    pub latencies: &'a [LatencySample],
    pub warnings: &'a [DiscoveryWarning],
    pub cancelled: bool,
}

/// Build and seal a baseline from interview results.
pub fn build_baseline(inputs: BaselineInputs<'_>) -> Result<BehavioralBaseline> {
    let mut tools = Vec::with_capacity(inputs.profiles.len());
    for profile in inputs.profiles {
        let descriptor = inputs
            .descriptors
            .iter()
            .find(|d| d.name == profile.name);
        tools.push(build_tool_fingerprint(profile, descriptor, inputs.latencies));
    }

    // Phase-3 comparison works over the flattened assertion set.
    let assertions: Vec<BehavioralAssertion> = tools
        .iter()
        .flat_map(|tool| tool.assertions.iter().cloned())
        .collect();

    let mut baseline = BehavioralBaseline {
        version: BehavioralBaseline::CURRENT_VERSION.into(),
        created_at: Utc::now(),
        server_command: inputs.server_command,
        server: inputs.server,
        summary: build_summary(&inputs_summary(&tools, inputs.profiles, inputs.warnings, inputs.cancelled)),
        tools,
        assertions,
        workflow_signatures: None,
        acceptance: None,
        integrity_hash: String::new(),
    };
    seal(&mut baseline)?;

    info!(
        tools = baseline.tools.len(),
        assertions = baseline.assertions.len(),
        hash = %baseline.integrity_hash,
        "baseline sealed"
    );
    Ok(baseline)
}

fn build_tool_fingerprint(
    profile: &ToolProfile,
    descriptor: Option<&ToolDescriptor>,
    latencies: &[LatencySample],
) -> ToolFingerprint {
    // Consensus over the argument structures actually sent; the declared
    // schema is carried alongside for the comparator.
    let observed_args: Vec<Value> = profile
        .interactions
        .iter()
        .map(|i| i.question.args.clone())
        .collect();
    let schema_hash = match infer_schema(&observed_args) {
        Some(schema) => hash_value(&serde_json::to_value(&schema).unwrap_or(Value::Null)),
        None => descriptor
            .map(|d| hash_value(&d.input_schema))
            .unwrap_or_else(|| hash_value(&Value::Null)),
    };

    let samples: Vec<ResponseSample> = profile
        .interactions
        .iter()
        .filter_map(|i| {
            if let Some(error) = &i.error {
                Some(ResponseSample::Error(error.clone()))
            } else {
                i.response.clone().map(ResponseSample::Response)
            }
        })
        .collect();
    let response_fingerprint = fingerprint_samples(&samples);

    let successful_responses: Vec<Value> = profile
        .interactions
        .iter()
        .filter(|i| i.error.is_none())
        .filter_map(|i| i.response.clone())
        .collect();
    let inferred_output_schema = infer_schema(&successful_responses);

    let errors: Vec<String> = profile
        .interactions
        .iter()
        .filter_map(|i| i.error.clone())
        .collect();
    let error_patterns = if errors.is_empty() {
        None
    } else {
        Some(group_error_patterns(&errors))
    };

    let tool_latencies: Vec<LatencySample> = latencies
        .iter()
        .filter(|sample| sample.tool_name == profile.name)
        .cloned()
        .collect();
    let perf = compute_performance(&tool_latencies);

    ToolFingerprint {
        name: profile.name.clone(),
        description: profile.description.clone(),
        input_schema: descriptor.map(|d| d.input_schema.clone()),
        schema_hash,
        assertions: extract_assertions(profile),
        security_notes: profile.security_notes.clone(),
        limitations: profile.limitations.clone(),
        response_fingerprint,
        inferred_output_schema,
        error_patterns,
        baseline_p50_ms: perf.p50_ms,
        baseline_p95_ms: perf.p95_ms,
        baseline_p99_ms: perf.p99_ms,
        baseline_success_rate: perf.success_rate,
        performance_confidence: Some(perf.confidence),
    }
}

/// Map free-text notes onto assertions with a fixed aspect and polarity.
fn extract_assertions(profile: &ToolProfile) -> Vec<BehavioralAssertion> {
    let mut assertions = Vec::new();

    for note in &profile.behavioral_notes {
        assertions.push(BehavioralAssertion {
            tool: profile.name.clone(),
            aspect: AssertionAspect::ResponseFormat,
            assertion: note.clone(),
            evidence: None,
            is_positive: true,
        });
    }
    for note in &profile.limitations {
        assertions.push(BehavioralAssertion {
            tool: profile.name.clone(),
            aspect: AssertionAspect::ErrorHandling,
            assertion: note.clone(),
            evidence: None,
            is_positive: false,
        });
    }
    for note in &profile.security_notes {
        assertions.push(BehavioralAssertion {
            tool: profile.name.clone(),
            aspect: AssertionAspect::Security,
            assertion: note.clone(),
            evidence: None,
            is_positive: !is_security_risk(note),
        });
    }
    assertions
}

fn is_security_risk(note: &str) -> bool {
    let lower = note.to_lowercase();
    lower.contains("risk") || lower.contains("vulnerab") || lower.contains("dangerous")
}

struct SummaryFacts {
    tool_count: usize,
    interaction_count: usize,
    partial_tools: Vec<String>,
    warning_count: usize,
    cancelled: bool,
}

fn inputs_summary(
    tools: &[ToolFingerprint],
    profiles: &[ToolProfile],
    warnings: &[DiscoveryWarning],
    cancelled: bool,
) -> SummaryFacts {
    SummaryFacts {
        tool_count: tools.len(),
        interaction_count: profiles.iter().map(|p| p.interactions.len()).sum(),
        partial_tools: profiles
            .iter()
            .filter(|p| p.partial)
            .map(|p| p.name.clone())
            .collect(),
        warning_count: warnings.len(),
        cancelled,
    }
}

fn build_summary(facts: &SummaryFacts) -> String {
    let mut summary = format!(
        "interviewed {} tools over {} interactions",
        facts.tool_count, facts.interaction_count
    );
    if facts.warning_count > 0 {
        summary.push_str(&format!("; {} discovery warnings", facts.warning_count));
    }
    if !facts.partial_tools.is_empty() {
        summary.push_str(&format!(
            "; short-circuited tools: {}",
            facts.partial_tools.join(", ")
        ));
    }
    if facts.cancelled {
        summary.push_str("; interview cancelled before completion");
    }
    summary
}

fn hash_value(value: &Value) -> String {
    sha256_hex_prefix(&canonical_json(value), SCHEMA_HASH_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_types::{
        ActualOutcome, ExpectedOutcome, OutcomeAssessment, Question, QuestionCategory,
        ToolInteraction,
    };

    fn server() -> ServerIdentity {
        ServerIdentity {
            name: "demo".into(),
            version: "1.0.0".into(),
            protocol_version: "2024-11-05".into(),
            capabilities: vec!["tools".into()],
        }
    }

    fn interaction(args: Value, response: Option<Value>, error: Option<&str>) -> ToolInteraction {
        let actual = if error.is_some() {
            ActualOutcome::Error
        } else {
            ActualOutcome::Success
        };
        ToolInteraction {
            tool_name: "echo".into(),
            question: Question {
                description: "probe".into(),
                category: QuestionCategory::HappyPath,
                args,
                expected_outcome: ExpectedOutcome::Either,
            },
            response,
            error: error.map(str::to_string),
            duration_ms: 3,
            tool_execution_ms: 2,
            outcome_assessment: OutcomeAssessment::assess(ExpectedOutcome::Either, actual),
        }
    }

    fn profile_with(notes: (&[&str], &[&str], &[&str])) -> ToolProfile {
        let mut profile = ToolProfile::new("echo", "echoes input");
        profile.interactions = vec![
            interaction(json!({"text": "a"}), Some(json!("a")), None),
            interaction(json!({"text": "b"}), None, Some("boom 42")),
        ];
        profile.behavioral_notes = notes.0.iter().map(|s| s.to_string()).collect();
        profile.limitations = notes.1.iter().map(|s| s.to_string()).collect();
        profile.security_notes = notes.2.iter().map(|s| s.to_string()).collect();
        profile
    }

    fn build(profiles: &[ToolProfile]) -> BehavioralBaseline {
        build_baseline(BaselineInputs {
            server: server(),
            server_command: "node server.js".into(),
            descriptors: &[ToolDescriptor {
                name: "echo".into(),
                description: Some("echoes input".into()),
                input_schema: json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            }],
            profiles,
            latencies: &[],
            warnings: &[],
            cancelled: false,
        })
        .unwrap()
    }

    #[test]
    fn baseline_is_sealed_and_lists_tools() {
        let baseline = build(&[profile_with((&["returns text"], &[], &[]))]);
        assert_eq!(baseline.tools.len(), 1);
        assert_eq!(baseline.integrity_hash.len(), 32);
        crate::integrity::verify(&baseline).unwrap();
    }

    #[test]
    fn notes_map_to_aspects_and_polarity() {
        let baseline = build(&[profile_with((
            &["returns text"],
            &["fails on empty input"],
            &["sanitizes paths", "risk: accepts traversal"],
        ))]);
        let assertions = &baseline.tools[0].assertions;

        let format = assertions
            .iter()
            .find(|a| a.aspect == AssertionAspect::ResponseFormat)
            .unwrap();
        assert!(format.is_positive);

        let limitation = assertions
            .iter()
            .find(|a| a.aspect == AssertionAspect::ErrorHandling)
            .unwrap();
        assert!(!limitation.is_positive);

        let security: Vec<_> = assertions
            .iter()
            .filter(|a| a.aspect == AssertionAspect::Security)
            .collect();
        assert_eq!(security.len(), 2);
        assert!(security.iter().any(|a| a.is_positive));
        assert!(security.iter().any(|a| !a.is_positive));
    }

    #[test]
    fn top_level_assertions_flatten_tool_assertions() {
        let baseline = build(&[profile_with((&["returns text"], &["fails"], &[]))]);
        assert_eq!(baseline.assertions.len(), 2);
    }

    #[test]
    fn error_interactions_feed_error_patterns() {
        let baseline = build(&[profile_with((&[], &[], &[]))]);
        let patterns = baseline.tools[0].error_patterns.as_ref().unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].count, 1);
    }

    #[test]
    fn schema_hash_is_deterministic_over_args() {
        let a = build(&[profile_with((&[], &[], &[]))]);
        let b = build(&[profile_with((&[], &[], &[]))]);
        assert_eq!(a.tools[0].schema_hash, b.tools[0].schema_hash);
    }

    #[test]
    fn summary_mentions_cancellation_and_partials() {
        let mut profile = profile_with((&[], &[], &[]));
        profile.partial = true;
        let baseline = build_baseline(BaselineInputs {
            server: server(),
            server_command: "node server.js".into(),
            descriptors: &[],
            profiles: &[profile],
            latencies: &[],
            warnings: &[],
            cancelled: true,
        })
        .unwrap();
        assert!(baseline.summary.contains("short-circuited tools: echo"));
        assert!(baseline.summary.contains("cancelled"));
    }
}
