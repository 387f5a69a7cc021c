//! Step execution tracker.
//!
//! Runs an ordered list of named, parameterized actions one at a time, retries
//! each failed action up to its own limit, and records every outcome in a
//! session that can be persisted and resumed. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (state shape, invariants,
//!   transitions, retry delays). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting pieces (action invocation, config and session
//!   files). Isolated so tests can script them.
//!
//! [`tracker`] drives the run loop; [`session`] ties it to session files for
//! the CLI.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tracker;
