//! Run-level state owned by a session.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::step::Step;
use crate::core::types::{Improvement, StepStatus};

/// Ordered steps plus the outcomes accumulated while running them.
///
/// Insertion order of `steps` is execution order. `current_step_index` and the
/// step statuses are only advanced by [`run`](crate::tracker::run).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfImprovementState {
    pub steps: Vec<Step>,
    pub improvements: BTreeMap<String, Improvement>,
    pub current_step_index: usize,
    pub completed: bool,
}

impl SelfImprovementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Append a step; a previously completed state becomes runnable again.
    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
        self.completed = false;
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Step the run loop will attempt next, if any.
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index)
    }

    pub fn has_remaining(&self) -> bool {
        self.current_step_index < self.steps.len()
    }

    pub fn report(&self) -> RunReport {
        let mut report = RunReport {
            completed: self.completed,
            ..RunReport::default()
        };
        for step in &self.steps {
            match step.status {
                StepStatus::Completed => report.succeeded.push(step.name.clone()),
                StepStatus::Failed => report.failed.push(FailedStep {
                    name: step.name.clone(),
                    retries: step.retries,
                    error: step.result.error().map(str::to_string),
                }),
                StepStatus::Pending | StepStatus::InProgress => {
                    report.pending.push(step.name.clone());
                }
            }
        }
        report
    }
}

/// Summary of a state's step outcomes, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub completed: bool,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedStep>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStep {
    pub name: String,
    pub retries: u32,
    pub error: Option<String>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.completed { "complete" } else { "incomplete" };
        writeln!(
            f,
            "session {state}: {} succeeded, {} failed, {} pending",
            self.succeeded.len(),
            self.failed.len(),
            self.pending.len()
        )?;
        for name in &self.succeeded {
            writeln!(f, "  ok      {name}")?;
        }
        for failed in &self.failed {
            match &failed.error {
                Some(error) => writeln!(
                    f,
                    "  failed  {} (retries={}): {error}",
                    failed.name, failed.retries
                )?,
                None => writeln!(f, "  failed  {} (retries={})", failed.name, failed.retries)?,
            }
        }
        for name in &self.pending {
            writeln!(f, "  pending {name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StepResult;
    use crate::test_support::step;

    #[test]
    fn push_step_reopens_completed_state() {
        let mut state = SelfImprovementState::new();
        state.completed = true;
        state.push_step(step("a"));
        assert!(!state.completed);
        assert!(state.has_remaining());
    }

    #[test]
    fn report_groups_steps_by_status() {
        let mut ok = step("a");
        ok.status = StepStatus::Completed;
        let mut failed = step("b");
        failed.status = StepStatus::Failed;
        failed.retries = 3;
        failed.result = StepResult::Failure {
            error: "boom".to_string(),
        };
        let state = SelfImprovementState::with_steps(vec![ok, failed, step("c")]);

        let report = state.report();
        assert_eq!(report.succeeded, vec!["a".to_string()]);
        assert_eq!(
            report.failed,
            vec![FailedStep {
                name: "b".to_string(),
                retries: 3,
                error: Some("boom".to_string()),
            }]
        );
        assert_eq!(report.pending, vec!["c".to_string()]);
        assert!(report.has_failures());
    }

    #[test]
    fn report_display_is_stable() {
        let mut ok = step("a");
        ok.status = StepStatus::Completed;
        let mut state = SelfImprovementState::with_steps(vec![ok]);
        state.current_step_index = 1;
        state.completed = true;

        let rendered = state.report().to_string();
        assert_eq!(
            rendered,
            "session complete: 1 succeeded, 0 failed, 0 pending\n  ok      a\n"
        );
    }
}
