//! Deterministic, pure logic shared by the tracker.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! session state and return deterministic outputs suitable for tests.

pub mod backoff;
pub mod invariants;
pub mod state;
pub mod step;
pub mod transition;
pub mod types;
