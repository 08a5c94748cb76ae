// src/context/mod.rs

//! Shared state threaded between steps.
//!
//! - [`store`] holds the live [`Context`] and its [`FrozenContext`] snapshot.
//! - [`args`] holds [`Args`], the filtered view a step body receives.

pub mod args;
pub mod store;

pub use args::Args;
pub use store::{Context, FrozenContext};
