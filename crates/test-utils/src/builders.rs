#![allow(dead_code)]

use std::collections::BTreeMap;

use serde_json::Value;
use stagerun::config::{PipelineFile, PipelineSection, RawPipelineFile, StepConfig};

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineFileBuilder {
    file: RawPipelineFile,
}

impl PipelineFileBuilder {
    pub fn new() -> Self {
        Self {
            file: RawPipelineFile {
                pipeline: PipelineSection::default(),
                parameters: serde_json::Map::new(),
                step: BTreeMap::new(),
            },
        }
    }

    pub fn with_step(mut self, name: &str, step: StepConfig) -> Self {
        self.file.step.insert(name.to_string(), step);
        self
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.file.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn allow_concurrency(mut self, val: bool) -> Self {
        self.file.pipeline.allow_concurrency = val;
        self
    }

    pub fn max_workers(mut self, val: usize) -> Self {
        self.file.pipeline.max_workers = Some(val);
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.file
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.file).expect("Failed to build valid pipeline file from builder")
    }
}

impl Default for PipelineFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StepConfig`.
pub struct StepConfigBuilder {
    step: StepConfig,
}

impl StepConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            step: StepConfig {
                cmd: cmd.to_string(),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.step.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}
