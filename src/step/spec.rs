// src/step/spec.rs

//! Step factory: attaches a name and prerequisites to a body.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Args;
use crate::step::Callable;
use crate::step::variants::{FnStep, ObjectStep, Retag};
use crate::types::StepName;

/// Scheduling identity shared by every step variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIdentity {
    pub name: StepName,
    pub depends_on: BTreeSet<StepName>,
}

/// Builder returned by [`step`]. Finish it with [`func`](StepSpec::func),
/// [`object`](StepSpec::object) or [`apply`](StepSpec::apply).
#[derive(Debug, Clone)]
pub struct StepSpec {
    identity: StepIdentity,
}

/// Start describing a step called `name` with no prerequisites.
pub fn step(name: impl Into<StepName>) -> StepSpec {
    StepSpec {
        identity: StepIdentity {
            name: name.into(),
            depends_on: BTreeSet::new(),
        },
    }
}

/// One-shot form of [`step`] for function bodies.
pub fn make_step<D, S, I, T, F>(
    name: impl Into<StepName>,
    depends_on: D,
    inputs: I,
    body: F,
) -> FnStep
where
    D: IntoIterator<Item = S>,
    S: Into<StepName>,
    I: IntoIterator<Item = T>,
    T: Into<String>,
    F: Fn(&Args) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    step(name).depends_on(depends_on).func(inputs, body)
}

impl StepSpec {
    /// Add prerequisite step names. Duplicates collapse.
    pub fn depends_on<D, S>(mut self, depends_on: D) -> Self
    where
        D: IntoIterator<Item = S>,
        S: Into<StepName>,
    {
        self.identity
            .depends_on
            .extend(depends_on.into_iter().map(Into::into));
        self
    }

    pub fn identity(&self) -> &StepIdentity {
        &self.identity
    }

    /// Wrap a function body reading the named `inputs`.
    pub fn func<I, T, F>(self, inputs: I, body: F) -> FnStep
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: Fn(&Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        FnStep::new(
            self.identity,
            inputs.into_iter().map(Into::into).collect(),
            Arc::new(body),
        )
    }

    /// Wrap an object implementing [`Callable`].
    pub fn object<T: Callable>(self, inner: T) -> ObjectStep<T> {
        ObjectStep::new(self.identity, inner)
    }

    /// Give an already wrapped step this identity. The previous identity is
    /// replaced, never stacked.
    pub fn apply<S: Retag>(self, wrapped: S) -> S {
        wrapped.retag(self.identity)
    }
}
