// src/config/build.rs

use tracing::debug;

use crate::config::model::PipelineFile;
use crate::context::Context;
use crate::errors::Result;
use crate::exec::CommandStep;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Build a runnable pipeline with one [`CommandStep`] per `[step.<name>]`.
pub fn build_pipeline(cfg: &PipelineFile) -> Result<Pipeline> {
    let mut options = PipelineOptions::default();
    if let Some(max_workers) = cfg.pipeline.max_workers {
        options.max_workers = max_workers;
    }

    let mut pipeline =
        Pipeline::new(Context::new(cfg.parameters.clone())).with_options(options);

    for (name, step) in cfg.step.iter() {
        let command = CommandStep::new(step.cmd.clone());
        debug!(
            step = %name,
            placeholders = ?command.placeholders(),
            "adding command step"
        );
        pipeline.add(command.into_step(name.clone(), step.after.iter().cloned()))?;
    }

    Ok(pipeline)
}
