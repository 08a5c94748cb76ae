// src/exec/mod.rs

//! Process-backed steps.
//!
//! - [`command`] provides [`CommandStep`], an object-backed step that runs a
//!   shell command with `{name}` placeholders filled from its arguments.

pub mod command;

pub use command::CommandStep;
