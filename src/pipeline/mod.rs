// src/pipeline/mod.rs

//! Step scheduler.
//!
//! - [`scheduler`] owns the graph, the step registry and the context, and
//!   drives a run.
//! - [`binding`] picks each step's arguments out of the context.
//! - [`batch`] runs the dependency-free steps concurrently.
//! - [`options`] holds tuning knobs and the per-run summary types.

pub mod batch;
pub mod binding;
pub mod options;
pub mod scheduler;

pub use options::{ExecutionPlan, MAX_WORKERS, PipelineOptions, RunSummary};
pub use scheduler::Pipeline;
