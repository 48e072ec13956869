//! Error types for the vigil framework.
//!
//! Provides [`VigilError`] as the top-level error umbrella. Leaf crates keep
//! their own fine-grained error enums and convert into this type at the
//! orchestration boundary, so callers can branch on the *kind* of failure
//! without depending on every leaf crate.

use thiserror::Error;

use crate::diagnostics::TransportErrorCategory;

/// Top-level error type for the vigil framework.
///
/// Variants are grouped into recoverable (transport timeouts, LLM transients)
/// and fatal (baseline format, budget, cancellation) categories to guide
/// callers on whether retrying is worthwhile.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VigilError {
    // ── Recoverable ──────────────────────────────────────────────────

    /// A transport-level failure while talking to the server under test.
    #[error("transport error ({category}) during {operation}: {message}")]
    Transport {
        /// Which failure class this was (timeout, invalid JSON, ...).
        category: TransportErrorCategory,
        /// The operation that was in flight (e.g. "tools/call").
        operation: String,
        /// Human-readable detail.
        message: String,
    },

    /// An LLM provider call failed after the fallback chain was exhausted.
    #[error("llm error: {message}")]
    Llm {
        /// Provider-supplied or synthesized error message.
        message: String,
        /// Whether retrying (e.g. on a later interview pass) may succeed.
        retryable: bool,
    },

    /// An operation exceeded its deadline.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Human-readable name of the operation that timed out.
        operation: String,
    },

    // ── Fatal ────────────────────────────────────────────────────────

    /// The configured token budget would be exceeded by the next call.
    #[error("token budget exceeded: needed {needed}, remaining {remaining}")]
    BudgetExceeded {
        /// Estimated tokens the call would consume.
        needed: u64,
        /// Tokens left in the budget.
        remaining: u64,
    },

    /// A baseline file failed structural validation.
    #[error("invalid baseline format: {reason}")]
    BaselineInvalidFormat {
        /// What is wrong with the file.
        reason: String,
    },

    /// A baseline file's integrity hash does not match its contents.
    #[error("baseline integrity mismatch: stored {stored}, computed {computed}")]
    BaselineIntegrityMismatch {
        /// The hash recorded in the file.
        stored: String,
        /// The hash recomputed over the canonical body.
        computed: String,
    },

    /// The operation was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VigilError {
    /// Whether the failure class is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { category, .. } => category.is_retryable(),
            Self::Llm { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// A convenience type alias using [`VigilError`].
pub type Result<T> = std::result::Result<T, VigilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_category_and_operation() {
        let err = VigilError::Transport {
            category: TransportErrorCategory::Timeout,
            operation: "tools/call".into(),
            message: "no reply within 5000ms".into(),
        };
        let text = err.to_string();
        assert!(text.contains("timeout"));
        assert!(text.contains("tools/call"));
    }

    #[test]
    fn budget_exceeded_is_not_retryable() {
        let err = VigilError::BudgetExceeded {
            needed: 1200,
            remaining: 300,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        let err = VigilError::Timeout {
            operation: "initialize".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(VigilError::Cancelled.to_string(), "cancelled");
    }
}
