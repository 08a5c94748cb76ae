// src/types.rs

//! Shared type aliases used across the engine.

use serde_json::{Map, Value};

/// Canonical step name type. Step names double as graph node identifiers
/// and as keys in the results map.
pub type StepName = String;

/// Ordered name → value map used for both parameters and results.
///
/// `serde_json` is built with `preserve_order`, so iteration follows
/// insertion order.
pub type ValueMap = Map<String, Value>;

/// Per-step results returned from a successful run, keyed by step name in
/// completion order.
pub type RunResult = ValueMap;

/// Reserved input name that binds a frozen view of the context.
pub const CONTEXT_ARG: &str = "ctx";
