//! Deterministic JSON encoding and content fingerprints.
//!
//! Every hash in vigil (cache keys, structure hashes, baseline integrity)
//! is computed over a *canonical* encoding: object keys sorted
//! lexicographically at every nesting level, arrays in order, timestamps
//! pre-rendered to ISO-8601 strings. Canonicalization is idempotent --
//! encoding an already-canonical document yields the same bytes.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Separator between fingerprint parts.
///
/// A non-printable byte so that `["ab", "c"]` and `["a", "bc"]` cannot
/// produce the same pre-image.
const PART_SEPARATOR: char = '\u{1f}';

/// Hex length of a content fingerprint: 32 hex chars = 128 bits, enough to
/// keep collision probability negligible at millions of entries.
pub const FINGERPRINT_HEX_LEN: usize = 32;

/// Encode a JSON value canonically: sorted keys at every level, arrays in
/// order, scalars via their serde_json display form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            out.push_str(&value.to_string());
        }
        Value::String(s) => {
            // Reuse serde_json's escaping so the output stays valid JSON.
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// Compute the 128-bit hex content fingerprint of a sequence of parts.
///
/// String parts are fed verbatim (without JSON quoting); every other value
/// is fed through [`canonical_json`]. Parts are joined by a non-printable
/// separator so part boundaries are unambiguous.
pub fn content_fingerprint(parts: &[Value]) -> String {
    let mut pre_image = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            pre_image.push(PART_SEPARATOR);
        }
        match part {
            Value::String(s) => pre_image.push_str(s),
            other => pre_image.push_str(&canonical_json(other)),
        }
    }
    sha256_hex_prefix(&pre_image, FINGERPRINT_HEX_LEN)
}

/// SHA-256 of `input`, hex-encoded and truncated to `len` characters.
pub fn sha256_hex_prefix(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.truncate(len);
    hex
}
