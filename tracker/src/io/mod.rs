//! I/O helpers for tracker commands.

pub mod action;
pub mod config;
pub mod session_store;
