// src/step/variants.rs

//! Function-backed and object-backed step wrappers.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Args;
use crate::step::spec::StepIdentity;
use crate::step::{Callable, Step};
use crate::types::StepName;

/// Shared, thread-safe function body.
pub type BodyFn = dyn Fn(&Args) -> anyhow::Result<Value> + Send + Sync;

/// Replace the scheduling identity of an already wrapped step.
pub trait Retag: Sized {
    fn retag(self, identity: StepIdentity) -> Self;
}

/// Step backed by a function or closure.
///
/// Wrapping does not touch the function: the caller's original stays
/// callable with its own signature, and [`FnStep::call`] behaves the same.
#[derive(Clone)]
pub struct FnStep {
    identity: StepIdentity,
    inputs: Vec<String>,
    body: Arc<BodyFn>,
}

impl FnStep {
    pub(crate) fn new(identity: StepIdentity, inputs: Vec<String>, body: Arc<BodyFn>) -> Self {
        Self {
            identity,
            inputs,
            body,
        }
    }

    /// Call the wrapped body directly, bypassing any scheduler.
    pub fn call(&self, args: &Args) -> anyhow::Result<Value> {
        (self.body)(args)
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn depends_on(&self) -> &BTreeSet<StepName> {
        &self.identity.depends_on
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn invoke(&self, args: &Args) -> anyhow::Result<Value> {
        self.call(args)
    }
}

impl Retag for FnStep {
    fn retag(mut self, identity: StepIdentity) -> Self {
        self.identity = identity;
        self
    }
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.identity.name)
            .field("depends_on", &self.identity.depends_on)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Step backed by an object implementing [`Callable`].
///
/// Derefs to the wrapped object so its own methods stay reachable.
#[derive(Debug, Clone)]
pub struct ObjectStep<T> {
    identity: StepIdentity,
    inputs: Vec<String>,
    inner: T,
}

impl<T: Callable> ObjectStep<T> {
    pub(crate) fn new(identity: StepIdentity, inner: T) -> Self {
        let inputs = inner.inputs();
        Self {
            identity,
            inputs,
            inner,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for ObjectStep<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Callable> Step for ObjectStep<T> {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn depends_on(&self) -> &BTreeSet<StepName> {
        &self.identity.depends_on
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn invoke(&self, args: &Args) -> anyhow::Result<Value> {
        self.inner.call(args)
    }
}

impl<T> Retag for ObjectStep<T> {
    fn retag(mut self, identity: StepIdentity) -> Self {
        self.identity = identity;
        self
    }
}
