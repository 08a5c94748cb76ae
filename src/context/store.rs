// src/context/store.rs

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{PipelineError, Result};
use crate::types::{RunResult, ValueMap};

/// Parameters supplied before a run plus one result per completed step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    parameters: ValueMap,
    results: ValueMap,
}

impl Context {
    pub fn new(parameters: ValueMap) -> Self {
        Self {
            parameters,
            results: ValueMap::new(),
        }
    }

    /// Set (or replace) a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.parameters
            .get(key)
            .ok_or_else(|| PipelineError::ParameterNotFound(key.to_string()))
    }

    /// Record a step result. Each key may be written once.
    pub fn set_result(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if self.results.contains_key(&key) {
            return Err(PipelineError::ResultOverwrite(key));
        }
        self.results.insert(key, value);
        Ok(())
    }

    pub fn get_result(&self, key: &str) -> Result<&Value> {
        self.results
            .get(key)
            .ok_or_else(|| PipelineError::ResultNotFound(key.to_string()))
    }

    pub fn parameters(&self) -> &ValueMap {
        &self.parameters
    }

    pub fn results(&self) -> &RunResult {
        &self.results
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    /// Deep, independent copy of the current state that rejects writes.
    pub fn freeze(&self) -> FrozenContext {
        FrozenContext {
            inner: Arc::new(self.clone()),
        }
    }
}

/// Read-only snapshot of a [`Context`].
///
/// Later changes to the live context are never visible here. Write
/// accessors exist only to fail with [`PipelineError::FrozenContext`].
#[derive(Clone, PartialEq)]
pub struct FrozenContext {
    inner: Arc<Context>,
}

impl FrozenContext {
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.inner.get(key)
    }

    pub fn get_result(&self, key: &str) -> Result<&Value> {
        self.inner.get_result(key)
    }

    pub fn parameters(&self) -> &ValueMap {
        self.inner.parameters()
    }

    pub fn results(&self) -> &RunResult {
        self.inner.results()
    }

    pub fn set(&self, _key: &str, _value: Value) -> Result<()> {
        Err(PipelineError::FrozenContext("set a parameter"))
    }

    pub fn set_result(&self, _key: &str, _value: Value) -> Result<()> {
        Err(PipelineError::FrozenContext("set a result"))
    }

    /// Mutable copy detached from this snapshot.
    pub fn thaw(&self) -> Context {
        Context::clone(&self.inner)
    }
}

impl fmt::Debug for FrozenContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrozenContext")
            .field("parameters", self.inner.parameters())
            .field("results", self.inner.results())
            .finish()
    }
}
