//! Baseline building, storage, and semantic comparison.
//!
//! - **[`builder`]** -- assemble interview results into a sealed
//!   [`BehavioralBaseline`](vigil_types::BehavioralBaseline)
//! - **[`integrity`]** -- canonical encoding and hash sealing/verification
//! - **[`store`]** -- versioned on-disk format with forward migration
//! - **[`assertion`]** -- assertion fingerprints and match confidence
//! - **[`compare`]** -- the three-phase semantic comparator

pub mod assertion;
pub mod builder;
pub mod compare;
pub mod error;
pub mod integrity;
pub mod store;

pub use assertion::{assertion_fingerprint, match_confidence};
pub use builder::{build_baseline, BaselineInputs};
pub use compare::diff_baselines;
pub use error::{BaselineError, Result};
pub use integrity::{compute_integrity_hash, seal, verify};
pub use store::{load_baseline, save_baseline, VerifyMode};
