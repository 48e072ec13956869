//! # vigil-types
//!
//! Core type definitions for the vigil behavioral interviewer.
//!
//! This crate is the foundation of the dependency graph -- all other
//! vigil crates depend on it. It contains:
//!
//! - **[`error`]** -- [`VigilError`], the cross-crate error umbrella
//! - **[`canonical`]** -- deterministic JSON encoding and content fingerprints
//! - **[`interview`]** -- questions, interactions, and per-tool profiles
//! - **[`analysis`]** -- response fingerprints, inferred schemas, error patterns
//! - **[`baseline`]** -- the versioned, hash-sealed behavioral baseline
//! - **[`diff`]** -- semantic diffs between two baselines
//! - **[`diagnostics`]** -- transport error records and discovery warnings

pub mod analysis;
pub mod baseline;
pub mod canonical;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod interview;

pub use analysis::{
    ContentType, ErrorPattern, ErrorPatternCategory, InferredSchema, PerformanceConfidence,
    PerformanceConfidenceLevel, ResponseFingerprint, SchemaType, SizeBucket,
};
pub use baseline::{
    AssertionAspect, BaselineAcceptance, BehavioralAssertion, BehavioralBaseline, ServerIdentity,
    ToolDescriptor, ToolFingerprint,
};
pub use canonical::{canonical_json, content_fingerprint, sha256_hex_prefix};
pub use diagnostics::{
    DiscoveryWarning, TransportErrorCategory, TransportErrorRecord, WarningLevel,
};
pub use diff::{BehavioralDiff, DiffSeverity, ToolChange, ToolModification};
pub use error::{Result, VigilError};
pub use interview::{
    ActualOutcome, ExpectedOutcome, LatencySample, OutcomeAssessment, Question, QuestionCategory,
    ToolInteraction, ToolProfile,
};
