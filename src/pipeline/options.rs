// src/pipeline/options.rs

use std::num::NonZeroUsize;

use tokio::sync::Semaphore;

use crate::types::StepName;

/// Largest usable `max_workers`; larger values are capped to this.
pub const MAX_WORKERS: usize = Semaphore::MAX_PERMITS;

/// Tuning knobs for [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Upper bound on step bodies running at once in the concurrent batch.
    pub max_workers: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

/// Order a pipeline would run in, without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Steps with no prerequisites; eligible for the concurrent batch.
    pub isolated: Vec<StepName>,
    /// Full topological order.
    pub ordered: Vec<StepName>,
}

/// Which steps ran where during the last run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps dispatched in the concurrent batch.
    pub concurrent: Vec<StepName>,
    /// Steps started one at a time, in start order.
    pub sequential: Vec<StepName>,
}

impl RunSummary {
    pub fn ran_concurrently(&self, step: &str) -> bool {
        self.concurrent.iter().any(|s| s == step)
    }
}
