//! Canonical encoding and content-addressed sealing of baselines.
//!
//! The integrity hash is the 128-bit SHA-256 prefix of the canonical JSON
//! encoding of the baseline with the hash field removed: object keys sorted
//! lexicographically at every level, dates as ISO-8601 UTC strings. Any
//! mutation of any field invalidates the hash.

use serde_json::Value;

use vigil_types::{canonical_json, sha256_hex_prefix, BehavioralBaseline};

use crate::error::{BaselineError, Result};

/// Hex length of an integrity hash (128 bits).
const INTEGRITY_HASH_LEN: usize = 32;

/// The serialized name of the hash field excluded from hashing.
const HASH_FIELD: &str = "integrityHash";

/// Compute the integrity hash of a baseline, ignoring its current hash
/// field.
pub fn compute_integrity_hash(baseline: &BehavioralBaseline) -> Result<String> {
    let mut value = serde_json::to_value(baseline)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove(HASH_FIELD);
    }
    Ok(sha256_hex_prefix(&canonical_json(&value), INTEGRITY_HASH_LEN))
}

/// Fill in the baseline's integrity hash.
pub fn seal(baseline: &mut BehavioralBaseline) -> Result<()> {
    baseline.integrity_hash = compute_integrity_hash(baseline)?;
    Ok(())
}

/// Verify that the stored hash matches the canonical body.
pub fn verify(baseline: &BehavioralBaseline) -> Result<()> {
    let computed = compute_integrity_hash(baseline)?;
    if computed != baseline.integrity_hash {
        return Err(BaselineError::IntegrityMismatch {
            stored: baseline.integrity_hash.clone(),
            computed,
        });
    }
    Ok(())
}

/// Rebuild a JSON value with object keys sorted at every level, for the
/// bit-stable pretty-printed file body.
pub fn sort_keys_deep(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), sort_keys_deep(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys_deep).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_types::ServerIdentity;

    fn sample_baseline() -> BehavioralBaseline {
        BehavioralBaseline {
            version: BehavioralBaseline::CURRENT_VERSION.into(),
            created_at: Utc::now(),
            server_command: "node server.js".into(),
            server: ServerIdentity {
                name: "demo".into(),
                version: "1.0.0".into(),
                protocol_version: "2024-11-05".into(),
                capabilities: vec!["tools".into()],
            },
            tools: vec![],
            summary: "interviewed 0 tools".into(),
            assertions: vec![],
            workflow_signatures: None,
            acceptance: None,
            integrity_hash: String::new(),
        }
    }

    #[test]
    fn seal_then_verify_roundtrips() {
        let mut baseline = sample_baseline();
        seal(&mut baseline).unwrap();
        assert_eq!(baseline.integrity_hash.len(), 32);
        verify(&baseline).unwrap();
    }

    #[test]
    fn any_mutation_invalidates_the_hash() {
        let mut baseline = sample_baseline();
        seal(&mut baseline).unwrap();

        let mut tampered = baseline.clone();
        tampered.summary = "interviewed 99 tools".into();
        assert!(matches!(
            verify(&tampered),
            Err(BaselineError::IntegrityMismatch { .. })
        ));

        let mut tampered = baseline.clone();
        tampered.server.version = "1.0.1".into();
        assert!(verify(&tampered).is_err());
    }

    #[test]
    fn hash_ignores_the_hash_field_itself() {
        let mut baseline = sample_baseline();
        seal(&mut baseline).unwrap();
        let first = baseline.integrity_hash.clone();
        // Re-sealing an already-sealed baseline is a no-op.
        seal(&mut baseline).unwrap();
        assert_eq!(baseline.integrity_hash, first);
    }

    #[test]
    fn sort_keys_deep_orders_every_level() {
        let value = serde_json::json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        let sorted = sort_keys_deep(&value);
        let encoded = serde_json::to_string(&sorted).unwrap();
        assert_eq!(encoded, r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#);
    }
}
