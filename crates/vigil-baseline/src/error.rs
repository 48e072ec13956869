//! Baseline error types.

use thiserror::Error;

/// Errors from baseline building, storage, and verification.
#[derive(Error, Debug)]
pub enum BaselineError {
    /// The file failed structural validation.
    #[error("invalid baseline format: {reason}")]
    InvalidFormat {
        reason: String,
    },

    /// The stored integrity hash does not match the canonical body.
    #[error("baseline integrity mismatch: stored {stored}, computed {computed}")]
    IntegrityMismatch {
        stored: String,
        computed: String,
    },

    /// The file's version is newer than this build understands.
    #[error("unsupported baseline version {found} (current is {current})")]
    UnsupportedVersion {
        found: String,
        current: String,
    },

    /// The file exceeds the size limit.
    #[error("baseline file of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        size: u64,
        max: u64,
    },

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience type alias for baseline operations.
pub type Result<T> = std::result::Result<T, BaselineError>;
