use serde::{Deserialize, Serialize};

use crate::core::types::{DEFAULT_MAX_RETRIES, Params, StepResult, StepStatus};

/// One unit of work in a session.
///
/// `action` is the key the step's action is registered under; it is resolved
/// against an [`ActionRegistry`](crate::io::action::ActionRegistry) when the
/// step is run, which keeps the step itself serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub action: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub result: StepResult,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Step {
    pub fn new(name: impl Into<String>, action: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            params,
            status: StepStatus::Pending,
            retries: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            result: StepResult::None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Retry budget exhausted without success.
    pub fn is_exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }
}
