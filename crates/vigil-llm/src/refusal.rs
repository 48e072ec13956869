//! Refusal detection: a refusal is a failure, not a completion.
//!
//! Every provider screens its completions here before returning. A refusal
//! is detected either from the stop reason (safety-filter stops) or from a
//! compiled phrase set matched against the start of the body.

use crate::error::{ProviderError, Result};
use crate::types::Completion;

/// Stop reasons that indicate a safety-filtered completion.
const REFUSAL_STOP_REASONS: [&str; 3] = ["content_filter", "safety", "refusal"];

/// Opening phrases that indicate the model declined rather than answered.
const REFUSAL_PHRASES: [&str; 12] = [
    "i can't help with",
    "i cannot help with",
    "i can't assist with",
    "i cannot assist with",
    "i'm unable to",
    "i am unable to",
    "i won't be able to",
    "i'm sorry, but i can't",
    "i'm sorry, but i cannot",
    "i must decline",
    "against my guidelines",
    "i cannot comply",
];

/// How far into the body phrases are searched. Refusals lead; a phrase deep
/// inside an otherwise substantive answer is not a refusal.
const SCAN_WINDOW: usize = 200;

/// Fail with [`ProviderError::Refused`] if the completion is a refusal.
pub fn check_completion(completion: &Completion) -> Result<()> {
    if let Some(reason) = &completion.stop_reason {
        if REFUSAL_STOP_REASONS.contains(&reason.as_str()) {
            return Err(ProviderError::Refused {
                reason: format!("stop reason '{reason}'"),
            });
        }
    }
    if let Some(phrase) = matched_phrase(&completion.text) {
        return Err(ProviderError::Refused {
            reason: format!("matched refusal phrase '{phrase}'"),
        });
    }
    Ok(())
}

fn matched_phrase(text: &str) -> Option<&'static str> {
    let window: String = text
        .chars()
        .take(SCAN_WINDOW)
        .collect::<String>()
        .to_lowercase();
    REFUSAL_PHRASES
        .iter()
        .find(|phrase| window.contains(**phrase))
        .copied()
}
