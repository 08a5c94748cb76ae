// src/pipeline/batch.rs

//! Concurrent execution of steps that have no prerequisites.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{self, JoinSet};
use tracing::debug;

use crate::context::Context;
use crate::errors::{PipelineError, Result};
use crate::pipeline::binding::{bind_arguments, invoke_blocking};
use crate::pipeline::options::MAX_WORKERS;
use crate::step::Step;
use crate::types::{StepName, ValueMap};

/// What came back from a concurrent batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful results, in dispatch order.
    pub completed: Vec<(StepName, Value)>,
    /// Earliest failure in dispatch order, if any step failed.
    pub failure: Option<PipelineError>,
}

/// Run `steps` in parallel with at most `max_workers` bodies in flight.
///
/// Every step is bound against `context` as it is at dispatch time, so
/// siblings never see each other's results. The batch always drains before
/// returning: a failure does not leave other bodies running in the
/// background.
pub async fn run_isolated_batch(
    steps: Vec<Arc<dyn Step>>,
    context: &Context,
    max_workers: usize,
) -> BatchOutcome {
    let permits = Arc::new(Semaphore::new(max_workers.clamp(1, MAX_WORKERS)));
    let sink: Arc<Mutex<ValueMap>> = Arc::new(Mutex::new(ValueMap::new()));
    let mut workers: JoinSet<Result<()>> = JoinSet::new();
    let mut owners: HashMap<task::Id, StepName> = HashMap::with_capacity(steps.len());
    let mut dispatched = Vec::with_capacity(steps.len());

    for step in steps {
        let name = step.name().to_string();
        let args = bind_arguments(step.as_ref(), context);
        let permits = Arc::clone(&permits);
        let sink = Arc::clone(&sink);
        let key = name.clone();

        let handle = workers.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Other(e.into()))?;
            let value = invoke_blocking(step, args).await?;
            // Keys are disjoint per worker; the lock guards the map itself.
            sink.lock().await.insert(key, value);
            Ok(())
        });
        owners.insert(handle.id(), name.clone());
        dispatched.push(name);
    }

    let mut failures = drain(workers, &owners).await;

    let mut results = sink.lock().await;
    let completed = dispatched
        .iter()
        .filter_map(|name| results.remove(name).map(|v| (name.clone(), v)))
        .collect();

    let failure = dispatched.iter().find_map(|name| failures.remove(name));

    BatchOutcome { completed, failure }
}

/// Wait for every worker and collect failures keyed by the step each task
/// was spawned for.
async fn drain(
    mut workers: JoinSet<Result<()>>,
    owners: &HashMap<task::Id, StepName>,
) -> HashMap<StepName, PipelineError> {
    let owner = |id: task::Id| owners.get(&id).cloned().unwrap_or_default();
    let mut failures = HashMap::new();

    while let Some(joined) = workers.join_next_with_id().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((id, Err(err))) => {
                failures.insert(owner(id), err);
            }
            Err(join_err) => {
                // Only the wrapper task can get here; bodies are caught in
                // `invoke_blocking`.
                debug!(error = %join_err, "concurrent worker aborted");
                let step = owner(join_err.id());
                let err = anyhow!("worker aborted: {join_err}");
                failures.insert(step.clone(), PipelineError::step_failed(step, err));
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fall_over(name: &str) -> Result<()> {
        panic!("wrapper for {name} fell over")
    }

    #[tokio::test]
    async fn aborted_workers_are_reported_under_their_own_step() {
        let mut workers: JoinSet<Result<()>> = JoinSet::new();
        let mut owners = HashMap::new();

        for name in ["first", "second"] {
            let handle = workers.spawn(async move { fall_over(name) });
            owners.insert(handle.id(), name.to_string());
        }
        let handle = workers.spawn(async { Ok(()) });
        owners.insert(handle.id(), "fine".to_string());

        let failures = drain(workers, &owners).await;

        assert_eq!(failures.len(), 2);
        for name in ["first", "second"] {
            assert_eq!(failures[name].step(), Some(name));
        }
        assert!(!failures.contains_key("fine"));
    }

    #[tokio::test]
    async fn oversized_worker_limit_is_capped() {
        let echo: Arc<dyn Step> = Arc::new(
            crate::step::step("echo").func(Vec::<String>::new(), |_| Ok(Value::Bool(true))),
        );

        let outcome = run_isolated_batch(vec![echo], &Context::default(), usize::MAX).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.completed, vec![("echo".to_string(), Value::Bool(true))]);
    }
}
