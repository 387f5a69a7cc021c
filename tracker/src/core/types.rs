//! Shared deterministic types for tracker core logic.
//!
//! These types define the persisted contract of a session. They must not
//! depend on external state or I/O so that serialized sessions stay stable
//! across runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named arguments passed to a step's action on every attempt.
pub type Params = Map<String, Value>;

/// Retry limit applied when a step is created without an explicit one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Lifecycle status of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

/// Most recent outcome of a step's action.
///
/// `None` means the action has not produced anything yet, which keeps "never
/// ran" distinct from "ran and returned null".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepResult {
    #[default]
    None,
    Success {
        output: Value,
    },
    Failure {
        error: String,
    },
}

impl StepResult {
    pub fn output(&self) -> Option<&Value> {
        match self {
            StepResult::Success { output } => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StepResult::Failure { error } => Some(error),
            _ => None,
        }
    }
}

/// Outcome recorded in `improvements` once a step reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Improvement {
    Completed { retries: u32, output: Value },
    Failed { retries: u32, error: String },
}

impl Improvement {
    pub fn is_failure(&self) -> bool {
        matches!(self, Improvement::Failed { .. })
    }

    pub fn retries(&self) -> u32 {
        match self {
            Improvement::Completed { retries, .. } | Improvement::Failed { retries, .. } => {
                *retries
            }
        }
    }
}
