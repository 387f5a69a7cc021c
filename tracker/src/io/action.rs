//! Action abstraction for step invocation.
//!
//! The [`Action`] trait decouples the run loop from what a step actually does.
//! Sessions store action keys; an [`ActionRegistry`] maps them to
//! implementations at run time. Tests register scripted actions.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::types::Params;

/// Capability invoked once per attempt with the step's params.
pub trait Action: Send + Sync {
    fn execute(&self, params: &Params) -> Result<Value>;
}

impl<F> Action for F
where
    F: Fn(&Params) -> Result<Value> + Send + Sync,
{
    fn execute(&self, params: &Params) -> Result<Value> {
        self(params)
    }
}

/// Registered actions, keyed by the name steps refer to.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `name`, replacing any previous registration.
    pub fn register<A: Action + 'static>(&mut self, name: impl Into<String>, action: A) {
        self.actions.insert(name.into(), Arc::new(action));
    }

    pub fn with<A: Action + 'static>(mut self, name: impl Into<String>, action: A) -> Self {
        self.register(name, action);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Invoke `action` once, bounded by `timeout` when set.
///
/// A panic inside the action is reported as a failed attempt, with or
/// without a timeout. With a timeout the action runs on a worker thread. If
/// it does not answer in time the attempt is reported as failed and the
/// worker is left to finish on its own; its late result is discarded.
#[instrument(skip_all, fields(timeout_ms = timeout.map(|t| t.as_millis() as u64)))]
pub fn invoke(action: Arc<dyn Action>, params: &Params, timeout: Option<Duration>) -> Result<Value> {
    let Some(timeout) = timeout else {
        return execute_guarded(action.as_ref(), params);
    };

    let (tx, rx) = mpsc::channel();
    let worker_params = params.clone();
    thread::Builder::new()
        .name("tracker-action".to_string())
        .spawn(move || {
            let result = execute_guarded(action.as_ref(), &worker_params);
            // Receiver is gone once the attempt timed out.
            let _ = tx.send(result);
        })
        .map_err(|err| anyhow!("spawn action worker: {err}"))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            debug!("action finished within timeout");
            result
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "action timed out");
            Err(anyhow!("action timed out after {:?}", timeout))
        }
        Err(RecvTimeoutError::Disconnected) => {
            warn!("action worker exited without a result");
            Err(anyhow!("action worker exited before producing a result"))
        }
    }
}

fn execute_guarded(action: &dyn Action, params: &Params) -> Result<Value> {
    panic::catch_unwind(AssertUnwindSafe(|| action.execute(params))).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(panic = message, "action panicked");
        Err(anyhow!("action panicked: {message}"))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
