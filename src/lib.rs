// src/lib.rs

//! Dependency-ordered step execution.
//!
//! Register [`step`]s on a [`Pipeline`], then [`run`](Pipeline::run) it:
//! steps run in a deterministic topological order, each receiving the
//! parameters and upstream results it names, and each result is recorded
//! under the step's name.
//!
//! ```
//! use serde_json::json;
//! use stagerun::{Context, Pipeline, step};
//!
//! # fn main() -> stagerun::errors::Result<()> {
//! let mut params = serde_json::Map::new();
//! params.insert("x".into(), json!(1));
//!
//! let mut pipeline = Pipeline::new(Context::new(params));
//! pipeline.add(step("inc").func(["x"], |a| Ok(json!(a.parse::<i64>("x")? + 1))))?;
//! pipeline.add(step("double").depends_on(["inc"]).func(["inc"], |a| {
//!     Ok(json!(a.parse::<i64>("inc")? * 2))
//! }))?;
//!
//! let results = pipeline.run_blocking(false)?;
//! assert_eq!(results["double"], json!(4));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod step;
pub mod types;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{PipelineFile, build_pipeline, load_and_validate};
use crate::pipeline::PipelineOptions;

pub use crate::context::{Args, Context, FrozenContext};
pub use crate::dag::DagGraph;
pub use crate::errors::PipelineError;
pub use crate::pipeline::Pipeline;
pub use crate::step::{Callable, Step, make_step, step};
pub use crate::types::{CONTEXT_ARG, RunResult, StepName};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline file loading and validation
/// - parameter overrides from the command line
/// - building the pipeline of command steps
/// - running it (or printing the plan for `--dry-run`)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let mut pipeline = build_pipeline(&cfg)?;

    if let Some(max_workers) = args.max_workers {
        pipeline = pipeline.with_options(PipelineOptions {
            max_workers: usize::from(max_workers),
        });
    }

    for (key, value) in args.params {
        debug!(parameter = %key, %value, "overriding parameter from command line");
        pipeline.context_mut().set(key, value);
    }

    if args.dry_run {
        print_dry_run(&cfg, &pipeline)?;
        return Ok(());
    }

    let allow_concurrency = args.parallel || cfg.pipeline.allow_concurrency;
    info!(steps = pipeline.len(), allow_concurrency, "starting pipeline run");

    let results = pipeline.run(allow_concurrency).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Simple dry-run output: print parameters, steps, dependencies and order.
fn print_dry_run(cfg: &PipelineFile, pipeline: &Pipeline) -> Result<()> {
    let plan = pipeline.plan()?;

    println!("stagerun dry-run");
    println!(
        "  pipeline.allow_concurrency = {}",
        cfg.pipeline.allow_concurrency
    );
    println!("  pipeline.max_workers = {}", pipeline.options().max_workers);
    println!();

    println!("parameters ({}):", pipeline.context().parameters().len());
    for (key, value) in pipeline.context().parameters() {
        println!("  {key} = {value}");
    }
    println!();

    println!("steps ({}):", cfg.step.len());
    for (name, step) in cfg.step.iter() {
        println!("  - {name}");
        println!("      cmd: {}", step.cmd);
        if !step.after.is_empty() {
            println!("      after: {:?}", step.after);
        }
    }
    println!();

    println!("isolated: {:?}", plan.isolated);
    println!("order:    {:?}", plan.ordered);

    debug!("dry-run complete (no execution)");
    Ok(())
}
