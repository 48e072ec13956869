//! Provider error types for vigil-llm.
//!
//! All provider operations return [`Result<T>`] which uses [`ProviderError`]
//! as the error type.

use thiserror::Error;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not reach the provider.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Authentication with the provider was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider returned a rate-limit response (HTTP 429).
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait time before retrying, in milliseconds.
        retry_after_ms: u64,
    },

    /// The provider returned a 5xx response.
    #[error("server error (HTTP {status}): {body}")]
    ServerError {
        status: u16,
        body: String,
    },

    /// The requested model does not exist on the provider.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The provider has not been configured (e.g. missing API key).
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The request failed for a reason without a dedicated variant.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The provider returned a response that could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request timed out.
    #[error("timeout")]
    Timeout,

    /// The model refused to answer instead of completing the request.
    #[error("model refused: {reason}")]
    Refused {
        reason: String,
    },

    /// The configured token budget would be exceeded.
    #[error("token budget exceeded: needed {needed}, remaining {remaining}")]
    BudgetExceeded {
        needed: u64,
        remaining: u64,
    },

    /// Every provider in the fallback chain failed.
    #[error("all providers exhausted: {}", attempts.join("; "))]
    Exhausted {
        /// Per-provider failure summaries, in chain order.
        attempts: Vec<String>,
    },

    /// An HTTP-level error from reqwest.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Determines whether a [`ProviderError`] counts against provider health and
/// should move the fallback chain along.
///
/// Auth failures are retryable only in the sense that the *next* provider
/// may be configured correctly; the same provider will keep failing.
pub fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Connection(_)
        | ProviderError::RateLimited { .. }
        | ProviderError::ServerError { .. }
        | ProviderError::AuthFailed(_)
        | ProviderError::Timeout
        | ProviderError::Http(_) => true,
        ProviderError::RequestFailed(msg) => {
            msg.starts_with("HTTP 500")
                || msg.starts_with("HTTP 502")
                || msg.starts_with("HTTP 503")
                || msg.starts_with("HTTP 504")
        }
        ProviderError::ModelNotFound(_)
        | ProviderError::NotConfigured(_)
        | ProviderError::InvalidResponse(_)
        | ProviderError::Refused { .. }
        | ProviderError::BudgetExceeded { .. }
        | ProviderError::Exhausted { .. }
        | ProviderError::Json(_) => false,
    }
}

/// A convenience type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_connection() {
        let err = ProviderError::Connection("connection reset".into());
        assert_eq!(err.to_string(), "connection failed: connection reset");
    }

    #[test]
    fn display_rate_limited() {
        let err = ProviderError::RateLimited {
            retry_after_ms: 5000,
        };
        assert_eq!(err.to_string(), "rate limited: retry after 5000ms");
    }

    #[test]
    fn display_refused() {
        let err = ProviderError::Refused {
            reason: "content_filter stop".into(),
        };
        assert_eq!(err.to_string(), "model refused: content_filter stop");
    }

    #[test]
    fn display_exhausted_joins_attempts() {
        let err = ProviderError::Exhausted {
            attempts: vec!["openai: timeout".into(), "ollama: connection".into()],
        };
        assert!(err.to_string().contains("openai: timeout; ollama: connection"));
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(is_retryable(&ProviderError::Timeout));
        assert!(is_retryable(&ProviderError::Connection("reset".into())));
        assert!(is_retryable(&ProviderError::RateLimited { retry_after_ms: 1 }));
        assert!(is_retryable(&ProviderError::ServerError {
            status: 503,
            body: "unavailable".into()
        }));
        assert!(is_retryable(&ProviderError::AuthFailed("bad key".into())));
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!is_retryable(&ProviderError::Refused {
            reason: "safety".into()
        }));
        assert!(!is_retryable(&ProviderError::BudgetExceeded {
            needed: 10,
            remaining: 1
        }));
        assert!(!is_retryable(&ProviderError::InvalidResponse("bad".into())));
        assert!(!is_retryable(&ProviderError::NotConfigured("no key".into())));
    }
}
