//! Stable exit codes for tracker CLI commands.

/// Command succeeded; for `status`, every step completed successfully.
pub const OK: i32 = 0;
/// Command failed due to an invalid session/config or other errors.
pub const INVALID: i32 = 1;
/// `tracker status` found steps that have not reached a terminal status.
pub const PENDING: i32 = 2;
/// `tracker status` found a finished session with permanently failed steps.
pub const FAILED: i32 = 3;
