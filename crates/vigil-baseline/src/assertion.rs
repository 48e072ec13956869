//! Assertion fingerprints and match confidence.
//!
//! Two assertions that say the same thing in different prose should compare
//! equal. The fingerprint reduces an assertion to a colon-joined,
//! lexicographically sorted tuple of its tool, aspect, and the action /
//! condition / output keywords found in its text; the comparator matches on
//! fingerprints and attaches a weighted confidence to every match.

use vigil_types::BehavioralAssertion;

/// Verbs describing what the tool does.
const ACTION_VERBS: [&str; 16] = [
    "returns", "rejects", "accepts", "fails", "handles", "validates", "requires", "supports",
    "responds", "errors", "throws", "ignores", "truncates", "retries", "times", "sanitizes",
];

/// Words describing the condition under which the behavior shows.
const CONDITION_KEYWORDS: [&str; 14] = [
    "empty", "missing", "invalid", "null", "large", "negative", "zero", "unicode", "concurrent",
    "malformed", "oversized", "suspicious", "duplicate", "unknown",
];

/// Words describing the observable output.
const OUTPUT_KEYWORDS: [&str; 12] = [
    "text", "json", "object", "array", "error", "list", "string", "number", "schema", "status",
    "timeout", "input",
];

/// Match-confidence factor weights.
const WEIGHT_FINGERPRINT: f64 = 0.4;
const WEIGHT_TOOL_ASPECT: f64 = 0.25;
const WEIGHT_POLARITY: f64 = 0.15;
const WEIGHT_SIMILARITY: f64 = 0.2;

/// Compute the fingerprint of an assertion.
pub fn assertion_fingerprint(assertion: &BehavioralAssertion) -> String {
    let words = keywords(&assertion.assertion);

    let mut verbs: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| ACTION_VERBS.contains(w))
        .collect();
    verbs.sort_unstable();
    verbs.dedup();

    let mut conditions: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| CONDITION_KEYWORDS.contains(w))
        .collect();
    conditions.sort_unstable();
    conditions.dedup();

    let mut outputs: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| OUTPUT_KEYWORDS.contains(w))
        .collect();
    outputs.sort_unstable();
    outputs.dedup();

    format!(
        "{}:{}:{}:{}:{}",
        assertion.tool,
        assertion.aspect.as_str(),
        verbs.join(","),
        conditions.join(","),
        outputs.join(","),
    )
}

/// Weighted confidence that two assertions describe the same behavior.
///
/// Factors: fingerprint match 0.4, same tool+aspect 0.25, same polarity
/// 0.15, keyword-overlap Jaccard similarity of the texts 0.2.
pub fn match_confidence(a: &BehavioralAssertion, b: &BehavioralAssertion) -> f64 {
    let mut confidence = 0.0;
    if assertion_fingerprint(a) == assertion_fingerprint(b) {
        confidence += WEIGHT_FINGERPRINT;
    }
    if a.tool == b.tool && a.aspect == b.aspect {
        confidence += WEIGHT_TOOL_ASPECT;
    }
    if a.is_positive == b.is_positive {
        confidence += WEIGHT_POLARITY;
    }
    confidence += WEIGHT_SIMILARITY * jaccard(&keywords(&a.assertion), &keywords(&b.assertion));
    confidence
}

/// Lowercased alphanumeric words, short noise words dropped.
fn keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.iter().filter(|w| b.contains(w)).count();
    let mut union: Vec<&String> = a.iter().chain(b.iter()).collect();
    union.sort_unstable();
    union.dedup();
    if union.is_empty() {
        return 0.0;
    }
    intersection as f64 / union.len() as f64
}
