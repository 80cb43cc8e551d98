//! cvx library - the command handlers behind the `cvx` binary
//!
//! Exposed as a library so the handlers can be tested without spawning the binary.

pub mod commands;
pub mod common;
pub mod errors;
pub mod project;
