// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::StepName;

/// Boxed error carried by a failed step.
pub type StepSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Inserting edges from `item` to `dependents` would close a cycle.
    /// The graph is left exactly as it was before the attempt.
    #[error("Cycle detected in DAG with `{item}` and {dependents:?}")]
    DagCycle {
        item: StepName,
        dependents: Vec<StepName>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "Steps `{}` depend on `{missing}`, but `{missing}` is not in the pipeline",
        dependents.join(", ")
    )]
    MissingDependency {
        missing: StepName,
        dependents: Vec<StepName>,
    },

    #[error("Step `{0}` is already registered")]
    DuplicateStep(StepName),

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Step `{step}` failed: {source}")]
    StepFailed {
        step: StepName,
        #[source]
        source: StepSource,
    },

    #[error("Cannot {0} in a frozen context")]
    FrozenContext(&'static str),

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Result not found: {0}")]
    ResultNotFound(String),

    #[error("Argument not bound for this step: {0}")]
    ArgumentNotFound(String),

    #[error("Argument `{name}` has an unexpected shape: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Result for `{0}` was already recorded in this run")]
    ResultOverwrite(StepName),

    #[error("Pipeline has already run; call `reset` before running it again")]
    AlreadyRan,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wrap a step body's error, keeping the step name for diagnostics.
    pub fn step_failed(step: impl Into<StepName>, err: anyhow::Error) -> Self {
        PipelineError::StepFailed {
            step: step.into(),
            source: err.into(),
        }
    }

    /// Name of the step responsible for this error, if there is one.
    pub fn step(&self) -> Option<&str> {
        match self {
            PipelineError::StepFailed { step, .. } => Some(step),
            PipelineError::DuplicateStep(step) => Some(step),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
