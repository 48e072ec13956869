//! Structural response fingerprinting.
//!
//! A fingerprint is content-indifferent and structure-sensitive: two
//! responses with the same shape but different values fingerprint the same.

use serde_json::Value;

use vigil_types::{sha256_hex_prefix, ContentType, ResponseFingerprint, SizeBucket};

/// One observed outcome for a tool: either a response value (possibly
/// `null`) or an error.
#[derive(Debug, Clone)]
pub enum ResponseSample {
    Response(Value),
    Error(String),
}

/// Hex length of a structure hash.
const STRUCTURE_HASH_LEN: usize = 16;

/// Strings this long made only of base64 characters are treated as binary
/// payloads rather than text.
const BINARY_MIN_LEN: usize = 256;

/// Derive a fingerprint from a sequence of observed samples.
///
/// Returns `None` when there are no samples at all. The structure hash and
/// `sample_count` consider only response samples; error samples still vote
/// on the content type.
pub fn fingerprint_samples(samples: &[ResponseSample]) -> Option<ResponseFingerprint> {
    if samples.is_empty() {
        return None;
    }

    let responses: Vec<&Value> = samples
        .iter()
        .filter_map(|s| match s {
            ResponseSample::Response(v) => Some(v),
            ResponseSample::Error(_) => None,
        })
        .collect();

    let shapes: Vec<String> = responses.iter().map(|v| structure_shape(v)).collect();
    let structure_hash = sha256_hex_prefix(&shapes.join(";"), STRUCTURE_HASH_LEN);

    let content_type = vote_content_type(samples);
    let size = responses
        .iter()
        .map(|v| serialized_len(v))
        .max()
        .map(SizeBucket::for_len)
        .unwrap_or(SizeBucket::Tiny);

    let is_empty = !responses.is_empty() && responses.iter().all(|v| is_empty_value(v));

    let fields = collect_fields(&responses);
    let array_item_structure = collect_array_item_structure(&responses);

    let consistency = consistency_score(&shapes);
    let confidence =
        (0.2 + 0.1 * responses.len() as f64 + 0.4 * consistency).min(1.0);

    Some(ResponseFingerprint {
        structure_hash,
        content_type,
        fields,
        array_item_structure,
        size,
        is_empty,
        sample_count: responses.len(),
        confidence,
    })
}

/// The canonical structural shape of a value.
///
/// Leaves become type tags, arrays become `[t]` with the join of their item
/// shapes, objects become `{k1:t1,...}` with sorted keys.
pub fn structure_shape(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "b".into(),
        Value::Number(_) => "n".into(),
        Value::String(_) => "s".into(),
        Value::Array(items) => {
            let mut shapes: Vec<String> = items.iter().map(structure_shape).collect();
            shapes.sort();
            shapes.dedup();
            format!("[{}]", shapes.join("|"))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .iter()
                .map(|k| format!("{k}:{}", structure_shape(&map[*k])))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

/// Classify one sample's root content kind.
fn classify(sample: &ResponseSample) -> ContentType {
    match sample {
        ResponseSample::Error(_) => ContentType::Error,
        ResponseSample::Response(value) => match value {
            Value::Null => ContentType::Empty,
            Value::String(s) if s.is_empty() => ContentType::Empty,
            Value::String(s) if looks_binary(s) => ContentType::Binary,
            Value::String(_) => ContentType::Text,
            Value::Bool(_) | Value::Number(_) => ContentType::Primitive,
            Value::Array(_) => ContentType::Array,
            Value::Object(_) => ContentType::Object,
        },
    }
}

/// Majority vote with a fixed tie-break order; samples that disagree in
/// kind across the board collapse to `Mixed`.
fn vote_content_type(samples: &[ResponseSample]) -> ContentType {
    // Tie-break priority, strongest first.
    const ORDER: [ContentType; 8] = [
        ContentType::Object,
        ContentType::Array,
        ContentType::Text,
        ContentType::Primitive,
        ContentType::Binary,
        ContentType::Empty,
        ContentType::Error,
        ContentType::Mixed,
    ];

    let kinds: Vec<ContentType> = samples.iter().map(classify).collect();
    let mut best = ContentType::Mixed;
    let mut best_count = 0usize;
    for candidate in ORDER {
        let count = kinds.iter().filter(|k| **k == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    // A strict majority keeps its kind; a fragmented sample set is mixed.
    if best_count * 2 >= kinds.len() {
        best
    } else {
        ContentType::Mixed
    }
}

fn looks_binary(s: &str) -> bool {
    s.len() >= BINARY_MIN_LEN
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

fn serialized_len(value: &Value) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Union of top-level keys across object samples, sorted.
fn collect_fields(responses: &[&Value]) -> Option<Vec<String>> {
    let mut fields: Vec<String> = Vec::new();
    let mut saw_object = false;
    for value in responses {
        if let Value::Object(map) = value {
            saw_object = true;
            for key in map.keys() {
                if !fields.contains(key) {
                    fields.push(key.clone());
                }
            }
        }
    }
    if saw_object {
        fields.sort();
        Some(fields)
    } else {
        None
    }
}

/// Joined item shape across array samples.
fn collect_array_item_structure(responses: &[&Value]) -> Option<String> {
    let mut shapes: Vec<String> = Vec::new();
    for value in responses {
        if let Value::Array(items) = value {
            for item in items {
                let shape = structure_shape(item);
                if !shapes.contains(&shape) {
                    shapes.push(shape);
                }
            }
        }
    }
    if shapes.is_empty() {
        return None;
    }
    shapes.sort();
    Some(shapes.join("|"))
}

/// Fraction of samples whose shape equals the majority shape.
fn consistency_score(shapes: &[String]) -> f64 {
    if shapes.is_empty() {
        return 0.0;
    }
    let majority = shapes
        .iter()
        .map(|candidate| shapes.iter().filter(|s| *s == candidate).count())
        .max()
        .unwrap_or(0);
    majority as f64 / shapes.len() as f64
}
