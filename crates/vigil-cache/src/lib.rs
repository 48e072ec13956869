//! Content-addressed response cache.
//!
//! Maps a stable 128-bit content fingerprint to a previously computed
//! artifact, with at most one live entry per fingerprint. Bounded by both an
//! entry count and a byte budget, evicting least-recently-used entries
//! first; entries expire after a TTL; an optional disk spill keeps one JSON
//! file per entry (best-effort, the directory listing is authoritative).

pub mod error;
pub mod keys;
pub mod store;

pub use error::{CacheError, Result};
pub use keys::{analysis_key, tool_key};
pub use store::{CacheConfig, CacheStats, ResponseCache};
