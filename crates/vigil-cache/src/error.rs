//! Cache error types.

use thiserror::Error;

/// Errors from cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The entry alone is bigger than the whole byte budget.
    #[error("entry of {size} bytes exceeds cache budget of {max} bytes")]
    EntryTooLarge {
        size: usize,
        max: usize,
    },

    /// Disk spill I/O failure (spill is best-effort; most callers log this).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The value could not be serialized for sizing or spilling.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
