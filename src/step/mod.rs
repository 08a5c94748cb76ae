// src/step/mod.rs

//! Steps: named units of work with declared prerequisites.
//!
//! A step is anything implementing [`Step`]: it has a name, a set of
//! prerequisite names, a list of inputs it wants bound from the context, and
//! can be invoked. Two variants are provided:
//!
//! - [`FnStep`] wraps a function or closure.
//! - [`ObjectStep`] wraps an object implementing [`Callable`].
//!
//! Both are built with the [`step`] factory:
//!
//! ```
//! use serde_json::json;
//! use stagerun::step::step;
//!
//! let add_one = step("add_one").func(["x"], |args| {
//!     Ok(json!(args.parse::<i64>("x")? + 1))
//! });
//! ```

pub mod spec;
pub mod variants;

use std::collections::BTreeSet;

use serde_json::Value;

use crate::context::Args;
use crate::types::{CONTEXT_ARG, StepName};

pub use spec::{StepIdentity, StepSpec, make_step, step};
pub use variants::{BodyFn, FnStep, ObjectStep, Retag};

/// Capability every schedulable unit of work provides.
///
/// The scheduler only relies on this trait, so function-backed and
/// object-backed steps are accepted uniformly.
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Names of steps that must complete before this one runs.
    fn depends_on(&self) -> &BTreeSet<StepName>;

    /// Names this step wants bound from the context. Available values not
    /// listed here are never passed. The reserved name
    /// [`CONTEXT_ARG`](crate::types::CONTEXT_ARG) binds a frozen context view.
    fn inputs(&self) -> &[String];

    fn invoke(&self, args: &Args) -> anyhow::Result<Value>;
}

/// Body contract for object-like steps.
///
/// Implement this on your own type and wrap it with
/// [`StepSpec::object`]; the object remains usable on its own.
pub trait Callable: Send + Sync {
    /// Inputs this object reads from the context.
    fn inputs(&self) -> Vec<String>;

    fn call(&self, args: &Args) -> anyhow::Result<Value>;
}

/// Reject steps whose identity cannot be scheduled.
///
/// The type system already guarantees the capability itself; this checks
/// the values carried by it.
pub fn check_capability(step: &dyn Step) -> crate::errors::Result<()> {
    use crate::errors::PipelineError;

    let name = step.name();
    if name.trim().is_empty() {
        return Err(PipelineError::InvalidStep(
            "step name must not be empty".to_string(),
        ));
    }
    if name == CONTEXT_ARG {
        return Err(PipelineError::InvalidStep(format!(
            "`{CONTEXT_ARG}` is reserved for the frozen context and cannot name a step"
        )));
    }
    if let Some(dep) = step.depends_on().iter().find(|d| d.trim().is_empty()) {
        return Err(PipelineError::InvalidStep(format!(
            "step `{name}` declares an empty dependency name ({dep:?})"
        )));
    }
    Ok(())
}
