//! Interview records: questions, invocations, and per-tool profiles.
//!
//! A [`Question`] is what the generator asks a tool; a [`ToolInteraction`] is
//! the immutable record of one invocation; a [`ToolProfile`] accumulates one
//! persona's interactions with one tool and is later merged across personas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The category a question targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    HappyPath,
    EdgeCase,
    ErrorHandling,
    Boundary,
    Security,
}

impl QuestionCategory {
    /// All categories in a stable order.
    pub const ALL: [QuestionCategory; 5] = [
        QuestionCategory::HappyPath,
        QuestionCategory::EdgeCase,
        QuestionCategory::ErrorHandling,
        QuestionCategory::Boundary,
        QuestionCategory::Security,
    ];
}

/// What the question generator expects the invocation to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    Success,
    Error,
    Either,
}

/// What actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActualOutcome {
    Success,
    Error,
}

/// A single generated question for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// What the question probes, in prose.
    pub description: String,
    /// The behavioral category this question belongs to.
    pub category: QuestionCategory,
    /// Concrete arguments to invoke the tool with.
    pub args: Value,
    /// The generator's expectation for the invocation.
    pub expected_outcome: ExpectedOutcome,
}

/// Comparison of expectation against observation for one invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeAssessment {
    pub expected: ExpectedOutcome,
    pub actual: ActualOutcome,
    pub correct: bool,
}

impl OutcomeAssessment {
    /// Assess an observed outcome against the question's expectation.
    ///
    /// `Either` always counts as correct.
    pub fn assess(expected: ExpectedOutcome, actual: ActualOutcome) -> Self {
        let correct = match expected {
            ExpectedOutcome::Either => true,
            ExpectedOutcome::Success => actual == ActualOutcome::Success,
            ExpectedOutcome::Error => actual == ActualOutcome::Error,
        };
        Self {
            expected,
            actual,
            correct,
        }
    }
}

/// The immutable record of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInteraction {
    /// The tool that was invoked.
    pub tool_name: String,
    /// The question that drove the invocation.
    pub question: Question,
    /// The tool's reply, if the call produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// The error message, if the call failed or the reply was flagged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the whole step, including generation overhead.
    pub duration_ms: u64,
    /// Duration of the tool call itself.
    pub tool_execution_ms: u64,
    /// Expectation vs. observation.
    pub outcome_assessment: OutcomeAssessment,
}

/// One latency sample fed into performance statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySample {
    pub tool_name: String,
    pub duration_ms: f64,
    pub success: bool,
    pub category: QuestionCategory,
    pub timestamp: DateTime<Utc>,
}

/// Accumulated observations for one tool.
///
/// One profile is built per persona pass; the merge step concatenates
/// interactions and set-unions the note lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProfile {
    pub name: String,
    pub description: String,
    pub interactions: Vec<ToolInteraction>,
    pub behavioral_notes: Vec<String>,
    pub limitations: Vec<String>,
    pub security_notes: Vec<String>,
    /// Set when the interview was cut short (cancellation, budget).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl ToolProfile {
    /// Create an empty profile for a tool.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            interactions: Vec::new(),
            behavioral_notes: Vec::new(),
            limitations: Vec::new(),
            security_notes: Vec::new(),
            partial: false,
        }
    }

    /// Merge another persona's profile for the same tool into this one.
    ///
    /// Interactions concatenate; notes set-union preserving first-seen order;
    /// `partial` is sticky.
    pub fn merge(&mut self, other: ToolProfile) {
        self.interactions.extend(other.interactions);
        merge_notes(&mut self.behavioral_notes, other.behavioral_notes);
        merge_notes(&mut self.limitations, other.limitations);
        merge_notes(&mut self.security_notes, other.security_notes);
        self.partial |= other.partial;
    }
}

fn merge_notes(dst: &mut Vec<String>, src: Vec<String>) {
    for note in src {
        if !dst.contains(&note) {
            dst.push(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn either_always_correct() {
        let a = OutcomeAssessment::assess(ExpectedOutcome::Either, ActualOutcome::Success);
        assert!(a.correct);
        let b = OutcomeAssessment::assess(ExpectedOutcome::Either, ActualOutcome::Error);
        assert!(b.correct);
    }

    #[test]
    fn mismatch_is_incorrect() {
        let a = OutcomeAssessment::assess(ExpectedOutcome::Success, ActualOutcome::Error);
        assert!(!a.correct);
        let b = OutcomeAssessment::assess(ExpectedOutcome::Error, ActualOutcome::Error);
        assert!(b.correct);
    }

    #[test]
    fn merge_unions_notes_and_concats_interactions() {
        let mut a = ToolProfile::new("echo", "echoes input");
        a.behavioral_notes.push("returns text".into());
        a.interactions.push(sample_interaction("first"));

        let mut b = ToolProfile::new("echo", "echoes input");
        b.behavioral_notes.push("returns text".into());
        b.behavioral_notes.push("handles unicode".into());
        b.interactions.push(sample_interaction("second"));
        b.partial = true;

        a.merge(b);
        assert_eq!(a.interactions.len(), 2);
        assert_eq!(a.behavioral_notes, vec!["returns text", "handles unicode"]);
        assert!(a.partial);
    }

    #[test]
    fn question_serde_uses_camel_case() {
        let q = Question {
            description: "calls with empty string".into(),
            category: QuestionCategory::EdgeCase,
            args: json!({"text": ""}),
            expected_outcome: ExpectedOutcome::Either,
        };
        let encoded = serde_json::to_string(&q).unwrap();
        assert!(encoded.contains(r#""expectedOutcome":"either""#));
        assert!(encoded.contains(r#""category":"edge_case""#));
    }

    #[test]
    fn partial_flag_omitted_when_false() {
        let p = ToolProfile::new("echo", "");
        let encoded = serde_json::to_string(&p).unwrap();
        assert!(!encoded.contains("partial"));
    }

    fn sample_interaction(desc: &str) -> ToolInteraction {
        ToolInteraction {
            tool_name: "echo".into(),
            question: Question {
                description: desc.into(),
                category: QuestionCategory::HappyPath,
                args: json!({}),
                expected_outcome: ExpectedOutcome::Success,
            },
            response: Some(json!("ok")),
            error: None,
            duration_ms: 5,
            tool_execution_ms: 4,
            outcome_assessment: OutcomeAssessment::assess(
                ExpectedOutcome::Success,
                ActualOutcome::Success,
            ),
        }
    }
}
