//! Parsing JSON out of model output.
//!
//! Models frequently wrap JSON in Markdown code fences; this strips them
//! before handing the string to serde.

use serde::de::DeserializeOwned;

use crate::error::{ProviderError, Result};

/// Parse a `T` from model output, stripping any Markdown code fences first.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let stripped = strip_code_fences(text);
    serde_json::from_str(stripped)
        .map_err(|e| ProviderError::InvalidResponse(format!("model output is not valid JSON: {e}")))
}

/// Remove ```json / ``` fences from around the content.
fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();

    let after_open = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };
    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);

    match after_open.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim_end(),
        None => after_open,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn bare_json_parses() {
        let value: Value = parse_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn json_fence_is_stripped() {
        let value: Value = parse_json("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn anonymous_fence_is_stripped() {
        let value: Value = parse_json("```\n[1, 2, 3]\n```").unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let value: Value = parse_json("  \n```json\n{\"ok\": true}\n```  \n").unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn typed_deserialization_works() {
        #[derive(serde::Deserialize)]
        struct Item {
            name: String,
        }
        let items: Vec<Item> = parse_json("```json\n[{\"name\": \"x\"}]\n```").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "x");
    }

    #[test]
    fn invalid_json_is_invalid_response() {
        let err = parse_json::<Value>("not json at all").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
