//! Structural invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::state::SelfImprovementState;
use crate::core::types::StepStatus;

/// Check structural invariants of a session:
/// - Step names are unique and non-empty
/// - Action keys are non-empty
/// - `max_retries > 0`
/// - `retries <= max_retries`
/// - Steps before `current_step_index` are terminal
/// - The step at `current_step_index` is `Pending` or `InProgress`
/// - Steps after it are `Pending`
/// - `current_step_index <= steps.len()`
///
/// An index equal to `steps.len()` means nothing is left to run.
pub fn validate_invariants(state: &SelfImprovementState) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let index = state.current_step_index;

    if index > state.steps.len() {
        errors.push(format!(
            "current_step_index {index} exceeds step count {}",
            state.steps.len()
        ));
    }

    for (position, step) in state.steps.iter().enumerate() {
        let label = format!("steps[{position}]");

        if step.name.trim().is_empty() {
            errors.push(format!("{label}: name must be non-empty"));
        } else if !seen.insert(step.name.as_str()) {
            errors.push(format!("{label}: duplicate name '{}'", step.name));
        }

        if step.action.trim().is_empty() {
            errors.push(format!("{label}: action must be non-empty"));
        }

        if step.max_retries == 0 {
            errors.push(format!("{label}: max_retries must be > 0"));
        }

        if step.retries > step.max_retries {
            errors.push(format!(
                "{label}: retries {} exceeds max_retries {}",
                step.retries, step.max_retries
            ));
        }

        if position < index && !step.is_terminal() {
            errors.push(format!(
                "{label}: status {} before current_step_index {index} must be terminal",
                step.status.as_str()
            ));
        }
        if position == index && step.is_terminal() {
            errors.push(format!(
                "{label}: current step must not be {}",
                step.status.as_str()
            ));
        }
        if position > index && step.status != StepStatus::Pending {
            errors.push(format!(
                "{label}: status {} after current_step_index {index} must be pending",
                step.status.as_str()
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;

    #[test]
    fn fresh_state_is_valid() {
        let state = SelfImprovementState::with_steps(vec![step("a"), step("b")]);
        assert!(validate_invariants(&state).is_empty());
    }

    #[test]
    fn empty_state_is_valid() {
        assert!(validate_invariants(&SelfImprovementState::new()).is_empty());
    }

    #[test]
    fn reports_structural_errors() {
        let mut bad_limit = step("dup");
        bad_limit.max_retries = 0;
        let mut overrun = step("dup");
        overrun.retries = 4;
        overrun.max_retries = 3;
        let mut no_action = step("c");
        no_action.action = String::new();
        let state = SelfImprovementState::with_steps(vec![bad_limit, overrun, no_action]);

        let errors = validate_invariants(&state);
        assert!(errors.iter().any(|err| err.contains("duplicate name 'dup'")));
        assert!(errors.iter().any(|err| err.contains("max_retries must be > 0")));
        assert!(errors.iter().any(|err| err.contains("exceeds max_retries")));
        assert!(errors.iter().any(|err| err.contains("action must be non-empty")));
    }

    #[test]
    fn reports_status_out_of_order_with_index() {
        let mut done_ahead = step("b");
        done_ahead.status = StepStatus::Completed;
        let mut state = SelfImprovementState::with_steps(vec![step("a"), step("x"), done_ahead]);
        state.current_step_index = 1;

        let errors = validate_invariants(&state);
        assert!(errors.iter().any(|err| err.contains("steps[0]") && err.contains("terminal")));
        assert!(errors.iter().any(|err| err.contains("steps[2]") && err.contains("pending")));
    }

    #[test]
    fn index_at_end_is_valid() {
        let mut done = step("a");
        done.status = StepStatus::Failed;
        done.retries = done.max_retries;
        let mut state = SelfImprovementState::with_steps(vec![done]);
        state.current_step_index = 1;
        assert!(validate_invariants(&state).is_empty());
    }

    #[test]
    fn index_past_end_is_rejected() {
        let mut done = step("a");
        done.status = StepStatus::Completed;
        let mut state = SelfImprovementState::with_steps(vec![done]);
        state.current_step_index = 5;
        assert_eq!(
            validate_invariants(&state),
            vec!["current_step_index 5 exceeds step count 1".to_string()]
        );

        state.steps.clear();
        state.current_step_index = 1;
        assert_eq!(validate_invariants(&state).len(), 1);
    }
}
