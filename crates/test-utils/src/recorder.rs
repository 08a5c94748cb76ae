use std::sync::{Arc, Mutex};

use serde_json::Value;
use stagerun::Args;
use stagerun::step::{FnStep, step};

/// Records the order in which step bodies start.
///
/// Clones share the same log, so one recorder can be captured by many
/// step closures.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.log.lock().unwrap().push(name.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.executed().iter().position(|n| n == name)
    }

    /// A step that records itself and returns its own name.
    pub fn step(&self, name: &str, depends_on: &[&str]) -> FnStep {
        let recorder = self.clone();
        let own = name.to_string();
        step(name)
            .depends_on(depends_on.iter().copied())
            .func(Vec::<String>::new(), move |_args: &Args| {
                recorder.record(&own);
                Ok(Value::String(own.clone()))
            })
    }
}
