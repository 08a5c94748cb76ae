// tests/pipeline_run.rs

mod common;
use crate::common::{Recorder, init_tracing, params, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use serde_json::{Value, json};
use stagerun::errors::PipelineError;
use stagerun::pipeline::PipelineOptions;
use stagerun::step::{Callable, Step, step};
use stagerun::{Args, CONTEXT_ARG, Context, Pipeline};

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct AddUpstream {
    x: i64,
}

impl Callable for AddUpstream {
    fn inputs(&self) -> Vec<String> {
        vec![CONTEXT_ARG.to_string()]
    }

    fn call(&self, args: &Args) -> anyhow::Result<Value> {
        let fun3 = args.ctx()?.get_result("fun3")?.as_i64().unwrap_or_default();
        Ok(json!(self.x + fun3))
    }
}

fn chain_pipeline() -> Result<Pipeline, PipelineError> {
    let mut pipeline = Pipeline::new(Context::new(params([
        ("x", json!(1)),
        ("some_arg", json!(5)),
    ])));

    pipeline.add(step("fun1").func(["x"], |a| Ok(json!(a.parse::<i64>("x")? + 1))))?;
    pipeline.add(step("fun2").depends_on(["fun1"]).func([CONTEXT_ARG], |a| {
        let prev = a.ctx()?.get_result("fun1")?.as_i64().unwrap_or_default();
        Ok(json!(prev + 1))
    }))?;
    pipeline.add(step("fun3").depends_on(["fun2"]).func([CONTEXT_ARG], |a| {
        let prev = a.ctx()?.get_result("fun2")?.as_i64().unwrap_or_default();
        Ok(json!(prev.pow(3)))
    }))?;
    pipeline.add(step("cls1").depends_on(["fun3"]).object(AddUpstream { x: 1 }))?;
    pipeline.add(step("other_task").func(["some_arg"], |a| {
        Ok(json!(a.parse::<i64>("some_arg")? * 5))
    }))?;

    Ok(pipeline)
}

#[tokio::test]
async fn chain_runs_sequentially_and_threads_results() -> TestResult {
    init_tracing();

    let mut pipeline = chain_pipeline()?;
    let results = pipeline.run(false).await?;

    assert_eq!(results["fun1"], json!(2));
    assert_eq!(results["fun2"], json!(3));
    assert_eq!(results["fun3"], json!(27));
    assert_eq!(results["cls1"], json!(28));
    assert_eq!(results["other_task"], json!(25));

    assert_eq!(pipeline.context().get_result("fun3")?, &json!(27));

    let summary = pipeline.last_run().expect("summary after run");
    assert!(summary.concurrent.is_empty());
    assert_eq!(summary.sequential.len(), 5);
    Ok(())
}

#[tokio::test]
async fn three_step_chain_matches_expected_values() -> TestResult {
    init_tracing();

    let mut pipeline = Pipeline::with_parameters(params([("x", json!(1))]));
    pipeline.add(step("fun1").func(["x"], |a| Ok(json!(a.parse::<i64>("x")? + 1))))?;
    pipeline.add(
        step("fun2")
            .depends_on(["fun1"])
            .func(["fun1"], |a| Ok(json!(a.parse::<i64>("fun1")? + 1))),
    )?;
    pipeline.add(
        step("fun3")
            .depends_on(["fun2"])
            .func(["fun2"], |a| Ok(json!(a.parse::<i64>("fun2")?.pow(3)))),
    )?;

    let results = pipeline.run(false).await?;

    let expected = params([("fun1", json!(2)), ("fun2", json!(3)), ("fun3", json!(27))]);
    assert_eq!(results, expected);
    Ok(())
}

#[tokio::test]
async fn independent_steps_run_in_the_concurrent_batch() -> TestResult {
    init_tracing();

    let mut pipeline = Pipeline::with_parameters(params([("x", json!(1)), ("y", json!(2))]));
    pipeline.add(step("fun1").func(["x"], |a| Ok(json!(a.parse::<i64>("x")? + 1))))?;
    pipeline.add(step("fun2").func(["y"], |a| Ok(json!(a.parse::<i64>("y")?.pow(2)))))?;

    let results = pipeline.run(true).await?;

    assert_eq!(results, params([("fun1", json!(2)), ("fun2", json!(4))]));

    let summary = pipeline.last_run().expect("summary after run");
    assert_eq!(summary.concurrent, vec!["fun1", "fun2"]);
    assert!(summary.ran_concurrently("fun1"));
    assert!(summary.ran_concurrently("fun2"));
    assert!(summary.sequential.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_batch_actually_overlaps() -> TestResult {
    init_tracing();

    let barrier = Arc::new(Barrier::new(2));
    let mut pipeline =
        Pipeline::new(Context::default()).with_options(PipelineOptions { max_workers: 2 });

    for name in ["left", "right"] {
        let barrier = Arc::clone(&barrier);
        pipeline.add(step(name).func(Vec::<String>::new(), move |_| {
            // Both bodies must be in flight at once to get past this.
            barrier.wait();
            Ok(Value::Bool(true))
        }))?;
    }

    let results = with_timeout(pipeline.run(true)).await?;
    assert_eq!(results.len(), 2);
    Ok(())
}

#[tokio::test]
async fn max_workers_bounds_the_batch() -> TestResult {
    init_tracing();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut pipeline =
        Pipeline::new(Context::default()).with_options(PipelineOptions { max_workers: 1 });

    for name in ["a", "b", "c"] {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        pipeline.add(step(name).func(Vec::<String>::new(), move |_| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Value::Null)
        }))?;
    }

    pipeline.run(true).await?;
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn oversized_worker_limit_still_runs_the_batch() -> TestResult {
    init_tracing();

    let mut pipeline = Pipeline::with_parameters(params([("x", json!(1))]))
        .with_options(PipelineOptions { max_workers: usize::MAX });
    pipeline.add(step("a").func(["x"], |a| Ok(json!(a.parse::<i64>("x")? + 1))))?;
    pipeline.add(step("b").func(Vec::<String>::new(), |_| Ok(json!("b"))))?;

    let results = with_timeout(pipeline.run(true)).await?;
    assert_eq!(results, params([("a", json!(2)), ("b", json!("b"))]));
    Ok(())
}

#[tokio::test]
async fn siblings_in_the_batch_do_not_see_each_other() -> TestResult {
    init_tracing();

    let build = |pipeline: &mut Pipeline| -> Result<(), PipelineError> {
        pipeline.add(step("s1").func(Vec::<String>::new(), |_| Ok(json!("one"))))?;
        pipeline.add(step("s2").func(["s1"], |a| Ok(json!(a.contains("s1")))))?;
        Ok(())
    };

    let mut concurrent = Pipeline::new(Context::default());
    build(&mut concurrent)?;
    let results = concurrent.run(true).await?;
    assert_eq!(results["s2"], json!(false));

    // Sequentially, s1 runs first and its result is visible by name.
    let mut sequential = Pipeline::new(Context::default());
    build(&mut sequential)?;
    let results = sequential.run(false).await?;
    assert_eq!(results["s2"], json!(true));
    Ok(())
}

#[tokio::test]
async fn dependents_start_after_their_prerequisites() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    // Registered out of order on purpose.
    pipeline.add(recorder.step("C", &["B"]))?;
    pipeline.add(recorder.step("A", &[]))?;
    pipeline.add(recorder.step("B", &["A"]))?;

    let results = pipeline.run(true).await?;

    assert_eq!(recorder.executed(), vec!["A", "B", "C"]);
    for name in ["A", "B", "C"] {
        assert_eq!(results[name], json!(name));
    }
    assert_eq!(pipeline.last_run().unwrap().concurrent, vec!["A"]);
    assert_eq!(pipeline.last_run().unwrap().sequential, vec!["B", "C"]);
    Ok(())
}

#[tokio::test]
async fn missing_dependency_is_reported_before_anything_runs() {
    init_tracing();

    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(recorder.step("spam", &[])).unwrap();
    pipeline.add(recorder.step("eggs", &["spam"])).unwrap();
    pipeline.add(recorder.step("foo", &["bar"])).unwrap();

    let err = pipeline.run(false).await.unwrap_err();
    match &err {
        PipelineError::MissingDependency { missing, dependents } => {
            assert_eq!(missing, "bar");
            assert_eq!(dependents, &vec!["foo".to_string()]);
        }
        other => panic!("expected MissingDependency, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("foo") && message.contains("bar"));

    assert!(recorder.executed().is_empty());
    assert!(pipeline.context().results().is_empty());
    // Rejected before the run started, so it can be fixed and run.
    assert!(!pipeline.has_run());
}

#[tokio::test]
async fn failing_step_aborts_and_keeps_earlier_results() {
    init_tracing();

    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(recorder.step("a", &[])).unwrap();
    let rec = recorder.clone();
    pipeline
        .add(step("b").depends_on(["a"]).func(Vec::<String>::new(), move |_| {
            rec.record("b");
            anyhow::bail!("disk full")
        }))
        .unwrap();
    pipeline.add(recorder.step("c", &["b"])).unwrap();

    let err = pipeline.run(false).await.unwrap_err();
    assert!(matches!(err, PipelineError::StepFailed { ref step, .. } if step == "b"));
    assert_eq!(err.step(), Some("b"));
    assert!(err.to_string().contains("disk full"));

    assert_eq!(recorder.executed(), vec!["a", "b"]);
    assert_eq!(pipeline.context().get_result("a").unwrap(), &json!("a"));
    assert!(pipeline.context().get_result("c").is_err());
}

#[tokio::test]
async fn panicking_step_is_a_step_failure() {
    init_tracing();

    let mut pipeline = Pipeline::new(Context::default());
    pipeline
        .add(step("boom").func(Vec::<String>::new(), |_| -> anyhow::Result<Value> {
            panic!("kaboom")
        }))
        .unwrap();

    let err = pipeline.run(false).await.unwrap_err();
    assert_eq!(err.step(), Some("boom"));
}

#[tokio::test]
async fn failure_in_the_batch_aborts_the_run() {
    init_tracing();

    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(recorder.step("x", &[])).unwrap();
    pipeline
        .add(step("y").func(Vec::<String>::new(), |_| Err(anyhow::anyhow!("bad input"))))
        .unwrap();
    pipeline.add(recorder.step("z", &["x"])).unwrap();

    let err = pipeline.run(true).await.unwrap_err();
    assert_eq!(err.step(), Some("y"));

    assert_eq!(pipeline.context().get_result("x").unwrap(), &json!("x"));
    assert!(!recorder.executed().contains(&"z".to_string()));
    assert_eq!(pipeline.last_run().unwrap().concurrent, vec!["x", "y"]);
}

#[tokio::test]
async fn only_declared_inputs_are_bound() -> TestResult {
    init_tracing();

    let mut pipeline = Pipeline::with_parameters(params([
        ("x", json!(1)),
        ("y", json!(2)),
        ("fun1", json!(100)),
    ]));
    pipeline.add(step("fun1").func(["x"], |a| {
        assert_eq!(a.names(), vec!["x"]);
        Ok(json!(a.parse::<i64>("x")? + 1))
    }))?;
    pipeline.add(step("probe").depends_on(["fun1"]).func(["fun1", "absent"], |a| {
        assert!(!a.contains("absent"));
        assert!(a.ctx().is_err());
        // The result shadows the parameter of the same name.
        Ok(a.get("fun1")?.clone())
    }))?;

    let results = pipeline.run(false).await?;
    assert_eq!(results["probe"], json!(2));
    Ok(())
}

#[tokio::test]
async fn frozen_context_handed_to_steps_is_read_only() -> TestResult {
    init_tracing();

    let mut pipeline = Pipeline::with_parameters(params([("x", json!(1))]));
    pipeline.add(step("writer").func([CONTEXT_ARG], |a| {
        let ctx = a.ctx()?;
        let rejected = ctx.set("x", json!(2)).is_err() && ctx.set_result("y", json!(3)).is_err();
        Ok(json!(rejected))
    }))?;

    let results = pipeline.run(false).await?;
    assert_eq!(results["writer"], json!(true));
    assert_eq!(pipeline.context().get("x")?, &json!(1));
    Ok(())
}

#[tokio::test]
async fn parameters_set_before_the_run_are_visible() -> TestResult {
    init_tracing();

    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(step("greet").func(["who"], |a| {
        Ok(json!(format!("hello {}", a.parse::<String>("who")?)))
    }))?;
    pipeline.context_mut().set("who", "world");

    let results = pipeline.run(false).await?;
    assert_eq!(results["greet"], json!("hello world"));
    Ok(())
}

#[tokio::test]
async fn a_pipeline_runs_once_until_reset() -> TestResult {
    init_tracing();

    let mut pipeline = chain_pipeline()?;
    let first = pipeline.run(false).await?;

    assert!(matches!(
        pipeline.run(false).await,
        Err(PipelineError::AlreadyRan)
    ));

    pipeline.reset();
    let second = pipeline.run(false).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn results_come_back_in_the_same_order_every_time() -> TestResult {
    init_tracing();

    let mut orders = Vec::new();
    for _ in 0..3 {
        let recorder = Recorder::new();
        let mut pipeline = Pipeline::new(Context::default());
        pipeline.add(recorder.step("package", &[]))?;
        pipeline.add(recorder.step("lint", &[]))?;
        pipeline.add(recorder.step("image", &["package"]))?;
        pipeline.add(recorder.step("scan", &["image", "lint"]))?;
        pipeline.add(recorder.step("push", &["image"]))?;

        let results = pipeline.run(false).await?;
        let keys: Vec<String> = results.keys().cloned().collect();
        assert_eq!(keys, recorder.executed());
        orders.push(keys);
    }

    assert!(orders.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(orders[0], vec!["package", "lint", "image", "scan", "push"]);
    Ok(())
}

#[test]
fn duplicate_names_are_rejected_without_side_effects() {
    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(recorder.step("a", &[])).unwrap();

    let err = pipeline.add(recorder.step("a", &["b"])).unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateStep(ref n) if n == "a"));

    assert_eq!(pipeline.len(), 1);
    assert!(!pipeline.graph().contains("b"));
    assert!(pipeline.step("a").unwrap().depends_on().is_empty());
}

#[test]
fn cyclic_registration_is_rolled_back() {
    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(recorder.step("m", &["n"])).unwrap();

    // Edges are inserted in name order: a_extra -> n succeeds, m -> n fails.
    let err = pipeline.add(recorder.step("n", &["a_extra", "m"])).unwrap_err();
    assert!(matches!(err, PipelineError::DagCycle { .. }));

    assert!(pipeline.step("n").is_none());
    assert!(!pipeline.graph().contains("a_extra"));
    assert_eq!(pipeline.graph().edge_count(), 1);
    assert!(pipeline.graph().contains_edge("n", "m"));
}

#[test]
fn self_dependency_is_a_cycle() {
    let mut pipeline = Pipeline::new(Context::default());
    let err = pipeline
        .add(step("me").depends_on(["me"]).func(Vec::<String>::new(), |_| Ok(Value::Null)))
        .unwrap_err();
    assert!(matches!(err, PipelineError::DagCycle { .. }));
    assert!(pipeline.is_empty());
    assert!(pipeline.graph().is_empty());
}

#[test]
fn plan_lists_isolated_and_ordered_steps() {
    let recorder = Recorder::new();
    let mut pipeline = Pipeline::new(Context::default());
    pipeline.add(recorder.step("e", &[])).unwrap();
    pipeline.add(recorder.step("d", &["e"])).unwrap();
    pipeline.add(recorder.step("a", &["d"])).unwrap();
    pipeline.add(recorder.step("b", &["a"])).unwrap();
    pipeline.add(recorder.step("c", &["a"])).unwrap();

    let plan = pipeline.plan().unwrap();
    assert_eq!(plan.isolated, vec!["e"]);
    assert_eq!(plan.ordered, vec!["e", "d", "a", "b", "c"]);
    assert_eq!(pipeline.step_names(), plan.ordered);
}

#[test]
fn run_blocking_works_without_a_runtime() {
    let mut pipeline = Pipeline::with_parameters(params([("x", json!(41))]));
    pipeline
        .add(step("answer").func(["x"], |a| Ok(json!(a.parse::<i64>("x")? + 1))))
        .unwrap();

    let results = pipeline.run_blocking(true).unwrap();
    assert_eq!(results["answer"], json!(42));
}

#[tokio::test]
async fn empty_pipeline_returns_no_results() -> TestResult {
    let mut pipeline = Pipeline::new(Context::default());
    assert!(pipeline.run(true).await?.is_empty());
    Ok(())
}
