//! Pure analysis over observed tool behavior.
//!
//! Everything here is deterministic computation with no I/O:
//!
//! - **[`fingerprint`]** -- structural response fingerprints
//! - **[`schema`]** -- recursive schema inference by folding a join
//! - **[`errors`]** -- error-string analysis and pattern grouping
//! - **[`perf`]** -- latency percentiles and performance confidence

pub mod errors;
pub mod fingerprint;
pub mod perf;
pub mod schema;

pub use errors::{analyze_error, group_error_patterns, ErrorAnalysis, ErrorSeverity, HttpErrorCategory};
pub use fingerprint::{fingerprint_samples, ResponseSample};
pub use perf::{compute_performance, PerformanceStats};
pub use schema::infer_schema;
