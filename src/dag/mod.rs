// src/dag/mod.rs

//! Dependency graph over step names.
//!
//! - [`graph`] holds the always-acyclic graph and its deterministic
//!   topological order.

pub mod graph;

pub use graph::DagGraph;
