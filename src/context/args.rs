// src/context/args.rs

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::FrozenContext;
use crate::errors::{PipelineError, Result};
use crate::types::{CONTEXT_ARG, ValueMap};

/// Named arguments bound for one step invocation.
///
/// Holds exactly the declared inputs that were available when the step was
/// invoked, plus the frozen context if the step asked for it.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: ValueMap,
    ctx: Option<FrozenContext>,
}

impl Args {
    pub fn new(values: ValueMap, ctx: Option<FrozenContext>) -> Self {
        Self { values, ctx }
    }

    /// Build arguments from `(name, value)` pairs, mostly for calling a
    /// wrapped body directly.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ctx: None,
        }
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| PipelineError::ArgumentNotFound(name.to_string()))
    }

    /// Deserialize a bound value into `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        T::deserialize(value).map_err(|e| PipelineError::InvalidArgument {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Frozen context view, bound when the step declares the `ctx` input.
    pub fn ctx(&self) -> Result<&FrozenContext> {
        self.ctx
            .as_ref()
            .ok_or_else(|| PipelineError::ArgumentNotFound(CONTEXT_ARG.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        if name == CONTEXT_ARG {
            return self.ctx.is_some();
        }
        self.values.contains_key(name)
    }

    /// Bound names, in binding order; `ctx` last when present.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        if self.ctx.is_some() {
            names.push(CONTEXT_ARG);
        }
        names
    }

    pub fn len(&self) -> usize {
        self.values.len() + usize::from(self.ctx.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }
}
