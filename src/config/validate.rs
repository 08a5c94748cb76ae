// src/config/validate.rs

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::dag::DagGraph;
use crate::errors::{PipelineError, Result};
use crate::exec::CommandStep;
use crate::pipeline::MAX_WORKERS;
use crate::types::CONTEXT_ARG;

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = PipelineError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineFile::new_unchecked(
            raw.pipeline,
            raw.parameters,
            raw.step,
        ))
    }
}

fn validate_raw_config(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_steps(cfg)?;
    validate_pipeline_section(cfg)?;
    validate_step_commands(cfg)?;
    validate_step_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_steps(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(PipelineError::ConfigError(
            "pipeline file must contain at least one [step.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_pipeline_section(cfg: &RawPipelineFile) -> Result<()> {
    match cfg.pipeline.max_workers {
        Some(0) => Err(PipelineError::ConfigError(
            "[pipeline].max_workers must be >= 1 (got 0)".to_string(),
        )),
        Some(n) if n > MAX_WORKERS => Err(PipelineError::ConfigError(format!(
            "[pipeline].max_workers must be <= {MAX_WORKERS} (got {n})"
        ))),
        _ => Ok(()),
    }
}

fn validate_step_commands(cfg: &RawPipelineFile) -> Result<()> {
    for (name, step) in cfg.step.iter() {
        if step.cmd.trim().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "step '{}' has an empty `cmd`",
                name
            )));
        }
        let command = CommandStep::new(step.cmd.as_str());
        if command.placeholders().iter().any(|p| p == CONTEXT_ARG) {
            return Err(PipelineError::ConfigError(format!(
                "step '{name}' cannot use the reserved `{{{CONTEXT_ARG}}}` placeholder"
            )));
        }
    }
    Ok(())
}

fn validate_step_dependencies(cfg: &RawPipelineFile) -> Result<()> {
    for (name, step) in cfg.step.iter() {
        for dep in step.after.iter() {
            if dep == name {
                return Err(PipelineError::ConfigError(format!(
                    "step '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.step.contains_key(dep) {
                return Err(PipelineError::ConfigError(format!(
                    "step '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawPipelineFile) -> Result<()> {
    // Edge direction: dep -> step. For `[step.B] after = ["A"]` we add A -> B.
    let mut graph = DagGraph::new();

    for name in cfg.step.keys() {
        graph.add(name, &[])?;
    }

    for (name, step) in cfg.step.iter() {
        for dep in step.after.iter() {
            graph.add(dep, &[name.as_str()])?;
        }
    }

    Ok(())
}
