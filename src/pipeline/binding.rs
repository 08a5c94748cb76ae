// src/pipeline/binding.rs

//! Argument binding and blocking invocation of step bodies.

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use tracing::{trace, warn};

use crate::context::{Args, Context};
use crate::errors::{PipelineError, Result};
use crate::step::Step;
use crate::types::{CONTEXT_ARG, ValueMap};

/// Bind the inputs `step` declares from the current state of `context`.
///
/// Available names are the parameters, the results so far (a result
/// shadows a parameter of the same name) and the reserved `ctx`, which binds
/// a frozen copy of the whole context. Declared names with no value are
/// left out; undeclared names are never passed.
pub fn bind_arguments(step: &dyn Step, context: &Context) -> Args {
    let mut values = ValueMap::new();
    let mut wants_ctx = false;

    for input in step.inputs() {
        if input == CONTEXT_ARG {
            wants_ctx = true;
            continue;
        }

        let value = context
            .results()
            .get(input)
            .or_else(|| context.parameters().get(input));

        match value {
            Some(v) => {
                values.insert(input.clone(), v.clone());
            }
            None => {
                trace!(step = step.name(), input = %input, "declared input has no value yet");
            }
        }
    }

    let ctx = wants_ctx.then(|| context.freeze());
    Args::new(values, ctx)
}

/// Run a step body on the blocking pool and wait for it.
///
/// Errors and panics from the body both surface as
/// [`PipelineError::StepFailed`].
pub async fn invoke_blocking(step: Arc<dyn Step>, args: Args) -> Result<Value> {
    let name = step.name().to_string();

    match tokio::task::spawn_blocking(move || step.invoke(&args)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(step = %name, error = %err, "step failed");
            Err(PipelineError::step_failed(name, err))
        }
        Err(join_err) => {
            warn!(step = %name, error = %join_err, "step panicked");
            Err(PipelineError::step_failed(
                name,
                anyhow!("step body panicked: {join_err}"),
            ))
        }
    }
}
