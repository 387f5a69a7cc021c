//! Tracker-owned state transitions for a single attempt.
//!
//! These functions are the only place step statuses, retry counters, the
//! improvements map and `current_step_index` change.

use serde_json::Value;

use crate::core::state::SelfImprovementState;
use crate::core::step::Step;
use crate::core::types::{Improvement, StepResult, StepStatus};

/// What the action reported for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    Failure(String),
}

/// Transition applied to the current step after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Step completed; index advanced.
    Completed,
    /// Step failed but has retries left; index unchanged.
    Retry,
    /// Retry budget exhausted; step failed permanently and index advanced.
    Failed,
}

/// Set `completed` when no step is left to attempt. Returns the new flag.
pub fn settle_completion(state: &mut SelfImprovementState) -> bool {
    state.completed = !state.has_remaining();
    state.completed
}

/// Mark the current step `InProgress` and return it.
pub fn begin_attempt(state: &mut SelfImprovementState) -> Result<&mut Step, String> {
    let index = state.current_step_index;
    let step = state
        .steps
        .get_mut(index)
        .ok_or_else(|| format!("no step at index {index}"))?;
    if step.is_terminal() {
        return Err(format!(
            "step '{}' is already {}",
            step.name,
            step.status.as_str()
        ));
    }
    step.status = StepStatus::InProgress;
    Ok(step)
}

/// Apply an attempt outcome to the current step.
///
/// Failures increment `retries` (saturating at `max_retries`); once the budget
/// is exhausted the step becomes `Failed`. Terminal transitions record an
/// improvement keyed by step name and advance `current_step_index`.
pub fn apply_attempt(
    state: &mut SelfImprovementState,
    outcome: AttemptOutcome,
) -> Result<Transition, String> {
    let index = state.current_step_index;
    let step = state
        .steps
        .get_mut(index)
        .ok_or_else(|| format!("no step at index {index}"))?;
    if step.is_terminal() {
        return Err(format!(
            "step '{}' is already {}",
            step.name,
            step.status.as_str()
        ));
    }

    let (transition, improvement) = match outcome {
        AttemptOutcome::Success(output) => {
            step.status = StepStatus::Completed;
            step.result = StepResult::Success {
                output: output.clone(),
            };
            (
                Transition::Completed,
                Some(Improvement::Completed {
                    retries: step.retries,
                    output,
                }),
            )
        }
        AttemptOutcome::Failure(error) => {
            if step.retries < step.max_retries {
                step.retries += 1;
            }
            step.result = StepResult::Failure {
                error: error.clone(),
            };
            if step.is_exhausted() {
                step.status = StepStatus::Failed;
                (
                    Transition::Failed,
                    Some(Improvement::Failed {
                        retries: step.retries,
                        error,
                    }),
                )
            } else {
                step.status = StepStatus::InProgress;
                (Transition::Retry, None)
            }
        }
    };

    if let Some(improvement) = improvement {
        let name = step.name.clone();
        state.improvements.insert(name, improvement);
        state.current_step_index += 1;
    }
    Ok(transition)
}

/// Fail the current step without attempting it when its budget is already spent.
///
/// Happens when a session is resumed with `retries == max_retries` on a step
/// that never reached a terminal status.
pub fn fail_if_exhausted(state: &mut SelfImprovementState) -> Option<Transition> {
    let step = state.steps.get(state.current_step_index)?;
    if step.is_terminal() || !step.is_exhausted() {
        return None;
    }
    let error = step
        .result
        .error()
        .unwrap_or("retry budget exhausted")
        .to_string();
    let step = &mut state.steps[state.current_step_index];
    step.status = StepStatus::Failed;
    let improvement = Improvement::Failed {
        retries: step.retries,
        error,
    };
    let name = step.name.clone();
    state.improvements.insert(name, improvement);
    state.current_step_index += 1;
    Some(Transition::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;
    use serde_json::json;

    #[test]
    fn success_completes_and_advances() {
        let mut state = SelfImprovementState::with_steps(vec![step("a"), step("b")]);
        begin_attempt(&mut state).expect("begin");

        let transition =
            apply_attempt(&mut state, AttemptOutcome::Success(json!({"ok": true}))).expect("apply");

        assert_eq!(transition, Transition::Completed);
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.steps[0].status, StepStatus::Completed);
        assert_eq!(state.steps[0].result.output(), Some(&json!({"ok": true})));
        assert_eq!(
            state.improvements.get("a"),
            Some(&Improvement::Completed {
                retries: 0,
                output: json!({"ok": true}),
            })
        );
    }

    #[test]
    fn failure_with_budget_left_stays_in_progress() {
        let mut state = SelfImprovementState::with_steps(vec![step("a")]);
        begin_attempt(&mut state).expect("begin");

        let transition =
            apply_attempt(&mut state, AttemptOutcome::Failure("nope".to_string())).expect("apply");

        assert_eq!(transition, Transition::Retry);
        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.steps[0].status, StepStatus::InProgress);
        assert_eq!(state.steps[0].retries, 1);
        assert_eq!(state.steps[0].result.error(), Some("nope"));
        assert!(state.improvements.is_empty());
    }

    #[test]
    fn failure_on_last_retry_fails_permanently() {
        let mut a = step("a").with_max_retries(2);
        a.retries = 1;
        a.status = StepStatus::InProgress;
        let mut state = SelfImprovementState::with_steps(vec![a]);

        let transition =
            apply_attempt(&mut state, AttemptOutcome::Failure("still no".to_string()))
                .expect("apply");

        assert_eq!(transition, Transition::Failed);
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.steps[0].status, StepStatus::Failed);
        assert_eq!(state.steps[0].retries, 2);
        assert!(state.improvements["a"].is_failure());
    }

    #[test]
    fn terminal_step_rejects_further_attempts() {
        let mut a = step("a");
        a.status = StepStatus::Completed;
        let mut state = SelfImprovementState::with_steps(vec![a]);

        let err = begin_attempt(&mut state).expect_err("terminal");
        assert!(err.contains("already completed"));
        let err = apply_attempt(&mut state, AttemptOutcome::Success(Value::Null))
            .expect_err("terminal");
        assert!(err.contains("already completed"));
    }

    #[test]
    fn missing_step_is_an_error() {
        let mut state = SelfImprovementState::new();
        let err = apply_attempt(&mut state, AttemptOutcome::Success(Value::Null))
            .expect_err("empty");
        assert!(err.contains("no step at index 0"));
    }

    #[test]
    fn exhausted_step_fails_without_attempt() {
        let mut a = step("a").with_max_retries(1);
        a.retries = 1;
        a.status = StepStatus::InProgress;
        a.result = StepResult::Failure {
            error: "last error".to_string(),
        };
        let mut state = SelfImprovementState::with_steps(vec![a, step("b")]);

        assert_eq!(fail_if_exhausted(&mut state), Some(Transition::Failed));
        assert_eq!(state.current_step_index, 1);
        assert_eq!(
            state.improvements.get("a"),
            Some(&Improvement::Failed {
                retries: 1,
                error: "last error".to_string(),
            })
        );
        assert_eq!(fail_if_exhausted(&mut state), None);
    }

    #[test]
    fn settle_completion_tracks_index() {
        let mut state = SelfImprovementState::new();
        assert!(settle_completion(&mut state));
        state.push_step(step("a"));
        assert!(!settle_completion(&mut state));
    }
}
