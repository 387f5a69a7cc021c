//! Orchestration for persisted sessions.
//!
//! A session is a [`SelfImprovementState`] stored as JSON. These helpers
//! combine the run loop with the session store so a run checkpoints after
//! every terminal step and can be resumed after an interruption.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::core::state::SelfImprovementState;
use crate::core::step::Step;
use crate::io::action::ActionRegistry;
use crate::io::config::RunConfig;
use crate::io::session_store::{load_session, write_session};
use crate::tracker::{RunOutcome, run_with_hook};

/// Create an empty session file at `path`.
///
/// Fails if the file exists unless `force` is set.
pub fn init_session(path: &Path, force: bool) -> Result<SelfImprovementState> {
    if path.exists() && !force {
        return Err(anyhow!(
            "session {} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    let state = SelfImprovementState::new();
    write_session(path, &state)?;
    info!(path = %path.display(), "initialized session");
    Ok(state)
}

/// Load `path`, or start from an empty session when it does not exist yet.
pub fn load_or_default(path: &Path) -> Result<SelfImprovementState> {
    if !path.exists() {
        debug!(path = %path.display(), "session missing, using empty state");
        return Ok(SelfImprovementState::new());
    }
    load_session(path)
}

/// Append `step` to the session at `path`, creating the session if needed.
pub fn add_step(path: &Path, step: Step) -> Result<SelfImprovementState> {
    let mut state = load_or_default(path)?;
    if state.step(&step.name).is_some() {
        return Err(anyhow!(
            "step '{}' already exists in {}",
            step.name,
            path.display()
        ));
    }
    debug!(step = %step.name, action = %step.action, "appending step");
    state.push_step(step);
    write_session(path, &state)?;
    Ok(state)
}

/// Load the session at `path`, run it, and persist progress.
///
/// The session is written after every step that reaches a terminal status
/// and once more when the run returns.
pub fn run_session(
    path: &Path,
    registry: &ActionRegistry,
    config: &RunConfig,
) -> Result<(SelfImprovementState, RunOutcome)> {
    let mut state = load_session(path)?;
    let outcome = run_with_hook(&mut state, registry, config, |state, report| {
        debug!(step = %report.name, status = ?report.status, "checkpointing session");
        write_session(path, state).with_context(|| format!("checkpoint after '{}'", report.name))
    })?;
    write_session(path, &state)?;
    info!(
        path = %path.display(),
        steps_finished = outcome.steps_finished,
        attempts = outcome.attempts,
        completed = state.completed,
        "session run finished"
    );
    Ok((state, outcome))
}
