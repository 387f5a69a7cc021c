//! Structural errors that abort a run before any attempt is made.
//!
//! Action failures never surface here; they are absorbed by the retry logic
//! and recorded in the session. Callers can `downcast_ref` these out of an
//! `anyhow::Error` to tell configuration problems apart from I/O errors.

use thiserror::Error;

/// Session violates structural invariants (duplicate names, bad retry limits, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed session: {}", .violations.join("; "))]
pub struct MalformedStateError {
    pub violations: Vec<String>,
}

/// A step still to run names an action nobody registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "step '{step}' references unregistered action '{action}' (registered: {})",
    registered_list(.registered)
)]
pub struct UnknownActionError {
    pub step: String,
    pub action: String,
    /// Action keys the registry did know about.
    pub registered: Vec<String>,
}

fn registered_list(registered: &[String]) -> String {
    if registered.is_empty() {
        "none".to_string()
    } else {
        registered.join(", ")
    }
}
