//! The step execution loop.
//!
//! [`run`] advances a [`SelfImprovementState`] one step at a time, retrying
//! failed attempts until a step's budget is spent, and stops once every step
//! is terminal or the configured step limit is reached. Stopping early leaves
//! the state resumable at `current_step_index`.

use std::thread;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::backoff::retry_delay;
use crate::core::invariants::validate_invariants;
use crate::core::state::SelfImprovementState;
use crate::core::transition::{
    AttemptOutcome, Transition, apply_attempt, begin_attempt, fail_if_exhausted,
    settle_completion,
};
use crate::core::types::StepStatus;
use crate::error::{MalformedStateError, UnknownActionError};
use crate::io::action::{ActionRegistry, invoke};
use crate::io::config::RunConfig;

/// Reason why `run` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    /// Every step is terminal; `completed` is set.
    Complete,
    /// `max_steps` steps finished in this run; more remain.
    StepLimitReached { next_index: usize, max_steps: u32 },
}

/// Summary of one `run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub started_at_index: usize,
    /// Steps that reached a terminal status during this run.
    pub steps_finished: u32,
    /// Action invocations made during this run.
    pub attempts: u32,
    pub stop: RunStop,
}

/// A step that just reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub retries: u32,
}

/// Run every remaining step of `state` to a terminal status.
pub fn run(
    state: &mut SelfImprovementState,
    registry: &ActionRegistry,
    config: &RunConfig,
) -> Result<RunOutcome> {
    run_with_hook(state, registry, config, |_, _| Ok(()))
}

/// Like [`run`], calling `on_step` after each step reaches a terminal status.
///
/// The hook sees the state with the step's outcome already applied and
/// `completed` already settled, which makes it the place to checkpoint. A
/// hook error aborts the run; the state is still consistent and can be
/// resumed.
///
/// Structural problems ([`MalformedStateError`], [`UnknownActionError`]) are
/// reported before any action is invoked.
#[instrument(skip_all, fields(steps = state.steps.len(), start = state.current_step_index))]
pub fn run_with_hook<F>(
    state: &mut SelfImprovementState,
    registry: &ActionRegistry,
    config: &RunConfig,
    mut on_step: F,
) -> Result<RunOutcome>
where
    F: FnMut(&SelfImprovementState, &StepReport) -> Result<()>,
{
    ensure_runnable(state, registry)?;

    let started_at_index = state.current_step_index;
    let mut steps_finished = 0u32;
    let mut attempts = 0u32;

    loop {
        if settle_completion(state) {
            debug!(steps_finished, attempts, "all steps terminal");
            return Ok(RunOutcome {
                started_at_index,
                steps_finished,
                attempts,
                stop: RunStop::Complete,
            });
        }
        if let Some(max_steps) = config.max_steps
            && steps_finished >= max_steps
        {
            info!(
                next_index = state.current_step_index,
                max_steps, "step limit reached"
            );
            return Ok(RunOutcome {
                started_at_index,
                steps_finished,
                attempts,
                stop: RunStop::StepLimitReached {
                    next_index: state.current_step_index,
                    max_steps,
                },
            });
        }

        let index = state.current_step_index;
        if fail_if_exhausted(state).is_some() {
            let report = step_report(state, index)?;
            warn!(step = %report.name, retries = report.retries, "retry budget already spent");
            steps_finished += 1;
            settle_completion(state);
            on_step(&*state, &report)?;
            continue;
        }

        let action_key = begin_attempt(state)
            .map_err(|err| anyhow!("begin attempt: {err}"))?
            .action
            .clone();
        let action = registry
            .get(&action_key)
            .ok_or_else(|| UnknownActionError {
                step: state.steps[index].name.clone(),
                action: action_key.clone(),
                registered: registry.names().map(str::to_string).collect(),
            })?;

        attempts += 1;
        let outcome = match invoke(action, &state.steps[index].params, config.action_timeout) {
            Ok(output) => AttemptOutcome::Success(output),
            Err(err) => AttemptOutcome::Failure(format!("{err:#}")),
        };
        let transition =
            apply_attempt(state, outcome).map_err(|err| anyhow!("apply attempt: {err}"))?;

        let step = &state.steps[index];
        match transition {
            Transition::Retry => {
                let delay = retry_delay(config.backoff_base, config.backoff_max, step.retries);
                warn!(
                    step = %step.name,
                    retries = step.retries,
                    max_retries = step.max_retries,
                    error = step.result.error().unwrap_or_default(),
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
            Transition::Completed | Transition::Failed => {
                if transition == Transition::Completed {
                    info!(step = %step.name, retries = step.retries, "step completed");
                } else {
                    warn!(step = %step.name, retries = step.retries, "step failed permanently");
                }
                let report = step_report(state, index)?;
                steps_finished += 1;
                settle_completion(state);
                on_step(&*state, &report)?;
            }
        }
    }
}

/// Fail fast on problems retries cannot fix.
fn ensure_runnable(state: &SelfImprovementState, registry: &ActionRegistry) -> Result<()> {
    let violations = validate_invariants(state);
    if !violations.is_empty() {
        return Err(MalformedStateError { violations }.into());
    }
    let remaining = state.steps.iter().skip(state.current_step_index);
    for step in remaining {
        if !registry.contains(&step.action) {
            return Err(UnknownActionError {
                step: step.name.clone(),
                action: step.action.clone(),
                registered: registry.names().map(str::to_string).collect(),
            }
            .into());
        }
    }
    Ok(())
}

fn step_report(state: &SelfImprovementState, index: usize) -> Result<StepReport> {
    let step = state
        .steps
        .get(index)
        .ok_or_else(|| anyhow!("no step at index {index}"))?;
    Ok(StepReport {
        index,
        name: step.name.clone(),
        status: step.status,
        retries: step.retries,
    })
}
