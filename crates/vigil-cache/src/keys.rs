//! Specialized cache key derivations.

use serde_json::{json, Value};
use vigil_types::content_fingerprint;

/// Key for a tool invocation: `fingerprint("tool", name, args)`.
pub fn tool_key(tool_name: &str, args: &Value) -> String {
    content_fingerprint(&[json!("tool"), json!(tool_name), args.clone()])
}

/// Key for an LLM-derived analysis of a response:
/// `fingerprint("analysis", name, args, response_hash)`.
pub fn analysis_key(tool_name: &str, args: &Value, response_hash: &str) -> String {
    content_fingerprint(&[
        json!("analysis"),
        json!(tool_name),
        args.clone(),
        json!(response_hash),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_key_is_argument_order_insensitive() {
        let a = tool_key("search", &json!({"q": "x", "limit": 5}));
        let b = tool_key("search", &json!({"limit": 5, "q": "x"}));
        assert_eq!(a, b);
    }

    #[test]
    fn tool_and_analysis_keys_never_collide() {
        let args = json!({"q": "x"});
        assert_ne!(tool_key("search", &args), analysis_key("search", &args, ""));
    }

    #[test]
    fn distinct_tools_get_distinct_keys() {
        let args = json!({});
        assert_ne!(tool_key("a", &args), tool_key("b", &args));
    }
}
