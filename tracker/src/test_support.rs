//! Test-only helpers for constructing steps and scripted actions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use crate::core::step::Step;
use crate::core::types::Params;

/// Create a pending step named `name` that runs the `ok` action.
pub fn step(name: &str) -> Step {
    Step::new(name, "ok", Params::new())
}

/// Create a pending step with an explicit action and retry limit.
pub fn step_with(name: &str, action: &str, max_retries: u32) -> Step {
    Step::new(name, action, Params::new()).with_max_retries(max_retries)
}

/// Action that always succeeds, echoing its params under `params`.
pub fn always_ok(params: &Params) -> Result<Value> {
    Ok(json!({ "ok": true, "params": params }))
}

/// Action that always fails.
pub fn always_fail(_params: &Params) -> Result<Value> {
    Err(anyhow!("scripted failure"))
}

/// Action that fails a fixed number of times, then succeeds.
///
/// Successful output is `{"attempt": n}` where `n` counts every call so far.
#[derive(Debug)]
pub struct FlakyAction {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyAction {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

impl crate::io::action::Action for FlakyAction {
    fn execute(&self, _params: &Params) -> Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(anyhow!("scripted failure {call}"));
        }
        Ok(json!({ "attempt": call }))
    }
}

/// Temporary directory holding a session file.
pub struct TestSession {
    dir: tempfile::TempDir,
}

impl TestSession {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.path().join("session.json")
    }
}
