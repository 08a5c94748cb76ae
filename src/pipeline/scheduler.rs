// src/pipeline/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::Context;
use crate::dag::DagGraph;
use crate::errors::{PipelineError, Result};
use crate::pipeline::batch::run_isolated_batch;
use crate::pipeline::binding::{bind_arguments, invoke_blocking};
use crate::pipeline::options::{ExecutionPlan, PipelineOptions, RunSummary};
use crate::step::{Step, check_capability};
use crate::types::{RunResult, StepName, ValueMap};

/// Scheduler composing a [`DagGraph`], a registry of [`Step`]s and a
/// [`Context`].
///
/// It is responsible for:
/// - registering steps and their dependency edges atomically
/// - rejecting dependencies on steps that were never registered
/// - running steps in the graph's deterministic order, optionally running
///   the dependency-free ones concurrently first
/// - recording each step's result into the context
///
/// A pipeline runs once. Call [`reset`](Pipeline::reset) to clear results
/// before running it again.
pub struct Pipeline {
    graph: DagGraph,
    steps: HashMap<StepName, Arc<dyn Step>>,
    context: Context,
    options: PipelineOptions,
    has_run: bool,
    last_run: Option<RunSummary>,
}

impl Pipeline {
    pub fn new(context: Context) -> Self {
        Self {
            graph: DagGraph::new(),
            steps: HashMap::new(),
            context,
            options: PipelineOptions::default(),
            has_run: false,
            last_run: None,
        }
    }

    pub fn with_parameters(parameters: ValueMap) -> Self {
        Self::new(Context::new(parameters))
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a step.
    ///
    /// Inserts the step's name and one edge per declared dependency into the
    /// graph. Fails without changing anything if:
    /// - the step's identity is unusable ([`PipelineError::InvalidStep`])
    /// - a step with the same name is registered ([`PipelineError::DuplicateStep`])
    /// - an edge would close a cycle ([`PipelineError::DagCycle`])
    pub fn add<S: Step + 'static>(&mut self, step: S) -> Result<()> {
        self.add_shared(Arc::new(step))
    }

    pub fn add_shared(&mut self, step: Arc<dyn Step>) -> Result<()> {
        check_capability(step.as_ref())?;

        let name = step.name().to_string();
        if self.steps.contains_key(&name) {
            return Err(PipelineError::DuplicateStep(name));
        }

        let checkpoint = self.graph.clone();
        if let Err(err) = insert_edges(&mut self.graph, step.as_ref()) {
            self.graph = checkpoint;
            return Err(err);
        }

        debug!(
            step = %name,
            depends_on = ?step.depends_on(),
            inputs = ?step.inputs(),
            "registered step"
        );
        self.steps.insert(name, step);
        Ok(())
    }

    /// Check that every node in the graph is a registered step.
    pub fn validate(&self) -> Result<()> {
        for name in self.graph.ordered() {
            if !self.steps.contains_key(&name) {
                let dependents = self.graph.edges_from(&name).into_iter().collect();
                return Err(PipelineError::MissingDependency {
                    missing: name,
                    dependents,
                });
            }
        }
        Ok(())
    }

    /// Validate and return the order a run would use.
    pub fn plan(&self) -> Result<ExecutionPlan> {
        self.validate()?;
        Ok(ExecutionPlan {
            isolated: self.graph.isolated(),
            ordered: self.graph.ordered(),
        })
    }

    /// Run every step and return a copy of the results.
    ///
    /// With `allow_concurrency`, steps without prerequisites run first as a
    /// concurrent batch; everything else runs one at a time in graph order.
    /// The first failing step aborts the run; results recorded before the
    /// failure stay in [`context`](Pipeline::context).
    pub async fn run(&mut self, allow_concurrency: bool) -> Result<RunResult> {
        if self.has_run {
            return Err(PipelineError::AlreadyRan);
        }
        let plan = self.plan()?;
        self.has_run = true;

        debug!(ordered = ?plan.ordered, isolated = ?plan.isolated, "computed execution order");

        let mut summary = RunSummary::default();
        let outcome = self.execute(plan, allow_concurrency, &mut summary).await;
        self.last_run = Some(summary);
        outcome?;

        Ok(self.context.results().clone())
    }

    /// Blocking form of [`run`](Pipeline::run) for callers without a Tokio
    /// runtime. Must not be called from inside one.
    pub fn run_blocking(&mut self, allow_concurrency: bool) -> Result<RunResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(allow_concurrency))
    }

    /// Clear results so the pipeline can run again. Parameters are kept.
    pub fn reset(&mut self) {
        self.context.clear_results();
        self.has_run = false;
        self.last_run = None;
    }

    pub fn has_run(&self) -> bool {
        self.has_run
    }

    /// Where each step ran during the last run, including a failed one.
    pub fn last_run(&self) -> Option<&RunSummary> {
        self.last_run.as_ref()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable access for setting parameters before a run.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn step(&self, name: &str) -> Option<&Arc<dyn Step>> {
        self.steps.get(name)
    }

    /// Registered step names, in graph order.
    pub fn step_names(&self) -> Vec<StepName> {
        self.graph
            .ordered()
            .into_iter()
            .filter(|name| self.steps.contains_key(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    async fn execute(
        &mut self,
        plan: ExecutionPlan,
        allow_concurrency: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut remaining = plan.ordered;

        if allow_concurrency && !plan.isolated.is_empty() {
            let batch = plan
                .isolated
                .iter()
                .map(|name| self.registered(name))
                .collect::<Result<Vec<_>>>()?;

            info!(steps = ?plan.isolated, "running isolated steps in parallel");
            summary.concurrent = plan.isolated.clone();

            let outcome =
                run_isolated_batch(batch, &self.context, self.options.max_workers).await;
            for (name, value) in outcome.completed {
                self.context.set_result(name, value)?;
            }
            if let Some(err) = outcome.failure {
                return Err(err);
            }

            remaining.retain(|name| !plan.isolated.contains(name));
        }

        for name in remaining {
            let step = self.registered(&name)?;
            let args = bind_arguments(step.as_ref(), &self.context);

            info!(step = %name, "running step");
            summary.sequential.push(name.clone());

            let value = invoke_blocking(step, args).await?;
            self.context.set_result(name, value)?;
        }

        Ok(())
    }

    fn registered(&self, name: &str) -> Result<Arc<dyn Step>> {
        self.steps.get(name).cloned().ok_or_else(|| {
            PipelineError::ConfigError(format!("step `{name}` is not registered"))
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("graph", &self.graph)
            .field("steps", &self.step_names())
            .field("context", &self.context)
            .field("options", &self.options)
            .field("has_run", &self.has_run)
            .finish()
    }
}

/// Insert `step`'s node and its dependency edges. The caller restores the
/// graph if this fails part-way.
fn insert_edges(graph: &mut DagGraph, step: &dyn Step) -> Result<()> {
    let name = step.name();
    graph.add(name, &[])?;
    for dep in step.depends_on() {
        graph.add(dep, &[name])?;
    }
    Ok(())
}
