//! Versioned on-disk baseline storage.
//!
//! The file body is pretty-printed JSON with keys sorted at every level,
//! UTF-8, trailing newline. Loading gates on file size, migrates older
//! format versions forward through an in-source migration table, and
//! verifies the integrity hash unless the caller explicitly opts out.

use std::path::Path;

use semver::Version;
use serde_json::Value;
use tracing::{debug, info, warn};

use vigil_types::BehavioralBaseline;

use crate::error::{BaselineError, Result};
use crate::integrity::{seal, sort_keys_deep, verify};

/// Baseline files beyond this size are rejected outright.
const MAX_BASELINE_BYTES: u64 = 32 * 1024 * 1024;

/// Whether `load_baseline` enforces the integrity hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Reject files whose hash does not match (the default).
    Require,
    /// Load anyway; the caller accepts tampered or hand-edited files.
    Skip,
}

/// Serialize a baseline to its bit-stable file body.
pub fn encode_baseline(baseline: &BehavioralBaseline) -> Result<String> {
    let value = serde_json::to_value(baseline)?;
    let mut body = serde_json::to_string_pretty(&sort_keys_deep(&value))?;
    body.push('\n');
    Ok(body)
}

/// Write a baseline to disk.
pub fn save_baseline(baseline: &BehavioralBaseline, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, encode_baseline(baseline)?)?;
    info!(path = %path.display(), hash = %baseline.integrity_hash, "baseline saved");
    Ok(())
}

/// Load a baseline from disk, migrating old versions forward.
pub fn load_baseline(path: impl AsRef<Path>, mode: VerifyMode) -> Result<BehavioralBaseline> {
    load_baseline_with_limit(path, mode, MAX_BASELINE_BYTES)
}

fn load_baseline_with_limit(
    path: impl AsRef<Path>,
    mode: VerifyMode,
    max_bytes: u64,
) -> Result<BehavioralBaseline> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(BaselineError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| BaselineError::InvalidFormat {
        reason: format!("not valid JSON: {e}"),
    })?;

    let found_version = value
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| BaselineError::InvalidFormat {
            reason: "missing version field".into(),
        })?
        .to_string();
    let found = parse_version(&found_version)?;
    let current = parse_version(BehavioralBaseline::CURRENT_VERSION)?;
    if found > current {
        return Err(BaselineError::UnsupportedVersion {
            found: found_version,
            current: BehavioralBaseline::CURRENT_VERSION.into(),
        });
    }

    let (value, migrated) = migrate(value, &found)?;
    let mut baseline: BehavioralBaseline =
        serde_json::from_value(value).map_err(|e| BaselineError::InvalidFormat {
            reason: format!("shape mismatch: {e}"),
        })?;

    if migrated {
        // The stored hash covered the old shape; reseal over the new one.
        warn!(path = %path.display(), from = %found_version, "baseline migrated, resealing");
        baseline.version = BehavioralBaseline::CURRENT_VERSION.into();
        seal(&mut baseline)?;
    } else if mode == VerifyMode::Require {
        verify(&baseline)?;
    }

    debug!(path = %path.display(), tools = baseline.tools.len(), "baseline loaded");
    Ok(baseline)
}

fn parse_version(text: &str) -> Result<Version> {
    Version::parse(text).map_err(|e| BaselineError::InvalidFormat {
        reason: format!("bad version '{text}': {e}"),
    })
}

/// Apply every migration step that is newer than the file's version.
///
/// Steps are ordered and cumulative; each transforms the raw JSON value.
fn migrate(mut value: Value, found: &Version) -> Result<(Value, bool)> {
    type Step = (&'static str, fn(Value) -> Result<Value>);
    // Versions the shape changed at, oldest first.
    const STEPS: [Step; 2] = [("2.0.0", migrate_v1_to_v2), ("2.1.0", migrate_v2_0_to_v2_1)];

    let mut migrated = false;
    for (introduced, step) in STEPS {
        let introduced = parse_version(introduced)?;
        if *found < introduced {
            value = step(value)?;
            migrated = true;
        }
    }
    Ok((value, migrated))
}

/// 1.x stored the server identity under `serverInfo` and had no top-level
/// assertion list.
fn migrate_v1_to_v2(mut value: Value) -> Result<Value> {
    if let Some(obj) = value.as_object_mut() {
        if let Some(server) = obj.remove("serverInfo") {
            obj.insert("server".into(), server);
        }
        obj.entry("assertions").or_insert(Value::Array(vec![]));
    }
    Ok(value)
}

/// 2.0 had no per-tool p99; nothing to rewrite, but the version bump keeps
/// the hash semantics aligned.
fn migrate_v2_0_to_v2_1(value: Value) -> Result<Value> {
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_types::ServerIdentity;

    fn sealed_baseline() -> BehavioralBaseline {
        let mut baseline = BehavioralBaseline {
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
        };
        seal(&mut baseline).unwrap();
        baseline
    }

    #[test]
    fn save_load_roundtrip_preserves_structure_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let baseline = sealed_baseline();
        save_baseline(&baseline, &path).unwrap();

        let loaded = load_baseline(&path, VerifyMode::Require).unwrap();
        assert_eq!(loaded.integrity_hash, baseline.integrity_hash);
        assert_eq!(loaded.server.name, baseline.server.name);
        assert_eq!(loaded.created_at, baseline.created_at);
        assert_eq!(
            serde_json::to_value(&loaded).unwrap(),
            serde_json::to_value(&baseline).unwrap()
        );
    }

    #[test]
    fn file_body_is_sorted_pretty_with_trailing_newline() {
        let body = encode_baseline(&sealed_baseline()).unwrap();
        assert!(body.ends_with('\n'));
        // Keys appear in lexicographic order.
        let created = body.find("\"createdAt\"").unwrap();
        let version = body.find("\"version\"").unwrap();
        let assertions = body.find("\"assertions\"").unwrap();
        assert!(assertions < created);
        assert!(created < version);
    }

    #[test]
    fn tampered_file_is_rejected_unless_opted_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let baseline = sealed_baseline();
        let tampered = encode_baseline(&baseline)
            .unwrap()
            .replace("interviewed 0 tools", "interviewed 1 tools");
        std::fs::write(&path, tampered).unwrap();

        let err = load_baseline(&path, VerifyMode::Require).unwrap_err();
        assert!(matches!(err, BaselineError::IntegrityMismatch { .. }));

        let loaded = load_baseline(&path, VerifyMode::Skip).unwrap();
        assert_eq!(loaded.summary, "interviewed 1 tools");
    }

    #[test]
    fn malformed_json_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_baseline(&path, VerifyMode::Require).unwrap_err();
        assert!(matches!(err, BaselineError::InvalidFormat { .. }));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        save_baseline(&sealed_baseline(), &path).unwrap();
        let err = load_baseline_with_limit(&path, VerifyMode::Require, 10).unwrap_err();
        assert!(matches!(err, BaselineError::TooLarge { .. }));
    }

    #[test]
    fn newer_version_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let body = encode_baseline(&sealed_baseline())
            .unwrap()
            .replace(BehavioralBaseline::CURRENT_VERSION, "9.0.0");
        std::fs::write(&path, body).unwrap();
        let err = load_baseline(&path, VerifyMode::Require).unwrap_err();
        assert!(matches!(err, BaselineError::UnsupportedVersion { .. }));
    }

    #[test]
    fn v1_file_is_migrated_and_resealed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let v1 = serde_json::json!({
            "version": "1.4.0",
            "createdAt": "2025-06-01T00:00:00Z",
            "serverCommand": "node server.js",
            "serverInfo": {
                "name": "old-demo",
                "version": "0.9.0",
                "protocolVersion": "2024-11-05",
                "capabilities": ["tools"]
            },
            "tools": [],
            "summary": "legacy run",
            "integrityHash": "0000"
        });
        std::fs::write(&path, serde_json::to_string_pretty(&v1).unwrap()).unwrap();

        let loaded = load_baseline(&path, VerifyMode::Require).unwrap();
        assert_eq!(loaded.version, BehavioralBaseline::CURRENT_VERSION);
        assert_eq!(loaded.server.name, "old-demo");
        // Migration recomputes the hash over the new shape.
        assert_ne!(loaded.integrity_hash, "0000");
        verify(&loaded).unwrap();
    }

    #[test]
    fn missing_version_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "{}").unwrap();
        let err = load_baseline(&path, VerifyMode::Require).unwrap_err();
        assert!(matches!(err, BaselineError::InvalidFormat { .. }));
    }
}
