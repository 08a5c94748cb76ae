// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::ValueMap;

/// Pipeline file as read from TOML, before validation.
///
/// ```toml
/// [pipeline]
/// allow_concurrency = true
/// max_workers = 2
///
/// [parameters]
/// image = "model:latest"
///
/// [step.package]
/// cmd = "tar czf model.tgz model/"
///
/// [step.build]
/// cmd = "docker build -t {image} ."
/// after = ["package"]
/// ```
///
/// All sections are optional at this stage; validation requires at least
/// one step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Initial context parameters.
    #[serde(default)]
    pub parameters: ValueMap,

    /// Steps from `[step.<name>]`, keyed by step name.
    #[serde(default)]
    pub step: BTreeMap<String, StepConfig>,
}

/// Validated pipeline file. Only constructed through
/// `PipelineFile::try_from(RawPipelineFile)`.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub pipeline: PipelineSection,
    pub parameters: ValueMap,
    pub step: BTreeMap<String, StepConfig>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        parameters: ValueMap,
        step: BTreeMap<String, StepConfig>,
    ) -> Self {
        Self {
            pipeline,
            parameters,
            step,
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSection {
    /// Run steps without prerequisites concurrently before the rest.
    #[serde(default)]
    pub allow_concurrency: bool,

    /// Bound on concurrently running steps. Defaults to available
    /// parallelism.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

/// `[step.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// Shell command; `{name}` placeholders are filled from parameters and
    /// upstream results.
    pub cmd: String,

    /// Steps that must finish before this one.
    #[serde(default)]
    pub after: Vec<String>,
}
