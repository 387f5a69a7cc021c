//! Session load/save helpers with schema + invariant validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::invariants::validate_invariants;
use crate::core::state::SelfImprovementState;
use crate::error::MalformedStateError;

/// JSON Schema every session file must satisfy.
pub const SESSION_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/session.schema.json"
));

/// Load and validate a session from disk (schema + invariants).
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_session(path: &Path) -> Result<SelfImprovementState> {
    debug!("loading session");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read session {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse session {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate session {}", path.display()))?;
    let state: SelfImprovementState = serde_json::from_value(value)
        .with_context(|| format!("deserialize session {}", path.display()))?;
    validate_state(&state).with_context(|| format!("validate session {}", path.display()))?;
    debug!(
        steps = state.steps.len(),
        current_step_index = state.current_step_index,
        completed = state.completed,
        "session loaded"
    );
    Ok(state)
}

/// Atomically write a session to disk (temp file + rename).
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_session(path: &Path, state: &SelfImprovementState) -> Result<()> {
    debug!(
        current_step_index = state.current_step_index,
        completed = state.completed,
        "writing session"
    );
    let mut buf = serde_json::to_string_pretty(state).context("serialize session")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Session files (`*.json`) directly inside `dir`, sorted by file name.
pub fn list_sessions(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
    let mut sessions = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            sessions.push(path);
        }
    }
    sessions.sort();
    Ok(sessions)
}

/// Check a parsed session value against [`SESSION_SCHEMA`].
pub fn validate_schema(session: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SESSION_SCHEMA).context("parse session schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(session) {
        let messages = compiled
            .iter_errors(session)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "session schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_state(state: &SelfImprovementState) -> Result<()> {
    let violations = validate_invariants(state);
    if violations.is_empty() {
        return Ok(());
    }
    Err(MalformedStateError { violations }.into())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp session {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace session {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Improvement, StepResult, StepStatus};
    use crate::test_support::step;
    use serde_json::json;

    /// Verifies write → load preserves every persisted field.
    #[test]
    fn session_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("session.json");

        let mut done = step("Analyze");
        done.status = StepStatus::Completed;
        done.result = StepResult::Success {
            output: json!({ "analysis": "Detailed analysis results." }),
        };
        let mut state = SelfImprovementState::with_steps(vec![done, step("Improve")]);
        state.current_step_index = 1;
        state.improvements.insert(
            "Analyze".to_string(),
            Improvement::Completed {
                retries: 0,
                output: json!({ "analysis": "Detailed analysis results." }),
            },
        );

        write_session(&path, &state).expect("write");
        let loaded = load_session(&path).expect("load");
        assert_eq!(loaded, state);
    }

    /// Ensures an empty session serializes to a known, stable JSON format.
    #[test]
    fn empty_session_format_is_deterministic() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("session.json");

        write_session(&path, &SelfImprovementState::new()).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        let expected = "{\n  \"steps\": [],\n  \"improvements\": {},\n  \"current_step_index\": 0,\n  \"completed\": false\n}\n";
        assert_eq!(contents, expected);
    }

    #[test]
    fn load_rejects_schema_violations() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("session.json");
        fs::write(&path, r#"{"steps":[{"name":"a"}]}"#).expect("write");

        let err = load_session(&path).expect_err("schema");
        assert!(format!("{err:#}").contains("session schema validation failed"));
    }

    #[test]
    fn load_rejects_invariant_violations() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("session.json");
        let state = SelfImprovementState::with_steps(vec![step("dup"), step("dup")]);
        write_session(&path, &state).expect("write");

        let err = load_session(&path).expect_err("invariants");
        let malformed = err
            .downcast_ref::<MalformedStateError>()
            .expect("malformed state error");
        assert!(malformed.violations[0].contains("duplicate name 'dup'"));
    }

    #[test]
    fn list_sessions_returns_sorted_json_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("b.json"), "{}").expect("write");
        fs::write(temp.path().join("a.json"), "{}").expect("write");
        fs::write(temp.path().join("notes.txt"), "").expect("write");
        fs::create_dir(temp.path().join("dir.json")).expect("mkdir");

        let sessions = list_sessions(temp.path()).expect("list");
        let names: Vec<_> = sessions
            .iter()
            .map(|path| path.file_name().expect("name").to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
