//! Analysis products: response fingerprints, inferred schemas, error
//! patterns, and performance confidence.
//!
//! These are pure value types; the derivation logic lives in
//! `vigil-analysis`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The dominant kind of content a tool returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Object,
    Array,
    Primitive,
    Empty,
    Error,
    Mixed,
    Binary,
}

/// Size bucket over the serialized response length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    Tiny,
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    /// Bucket a serialized byte length.
    pub fn for_len(len: usize) -> Self {
        match len {
            0..=128 => Self::Tiny,
            129..=2048 => Self::Small,
            2049..=65536 => Self::Medium,
            _ => Self::Large,
        }
    }
}

/// A content-indifferent, structure-sensitive summary of a tool's outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFingerprint {
    /// Hash over the per-sample structural shapes.
    pub structure_hash: String,
    /// Majority content kind across samples.
    pub content_type: ContentType,
    /// Top-level field names, when the responses are objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Structural shape of array items, when the responses are arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_item_structure: Option<String>,
    /// Size bucket of the largest observed sample.
    pub size: SizeBucket,
    /// Whether the tool only ever returned empty content.
    pub is_empty: bool,
    /// How many non-null responses fed this fingerprint.
    pub sample_count: usize,
    /// Confidence in [0, 1]; rises with samples and structural consistency.
    pub confidence: f64,
}

/// JSON type lattice used by schema inference.
///
/// Widening order: `null < bool < integer < number < string`. `array` and
/// `object` only join with themselves; mixed kinds widen to `string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl SchemaType {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

/// A recursive schema inferred from observed values.
///
/// Self-referential through boxed `items` and the `properties` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredSchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    /// Child schemas for object properties. BTreeMap keeps key order stable
    /// for canonical encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, InferredSchema>>,
    /// Item schema for arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<InferredSchema>>,
    /// Properties present in every observed sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Whether null was observed alongside the dominant type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Observed finite value domain, when small enough.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl InferredSchema {
    /// A schema of one bare type with nothing else inferred.
    pub fn of_type(kind: SchemaType) -> Self {
        Self {
            kind,
            properties: None,
            items: None,
            required: None,
            nullable: None,
            enum_values: None,
        }
    }
}

/// Category an error message is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPatternCategory {
    Validation,
    NotFound,
    Permission,
    Timeout,
    Internal,
    Unknown,
}

/// A group of error messages sharing a category and normalized shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPattern {
    pub category: ErrorPatternCategory,
    /// Hash of the message with identifiers, numbers, and quoted literals
    /// stripped.
    pub pattern_hash: String,
    /// One representative raw message.
    pub example: String,
    /// How many samples fell into this group.
    pub count: usize,
}

/// How much to trust the performance percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Statistical confidence attached to baseline performance numbers.
///
/// Only successful happy-path samples contribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfidence {
    pub sample_count: usize,
    pub standard_deviation: f64,
    pub coefficient_of_variation: f64,
    pub confidence_level: PerformanceConfidenceLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}
