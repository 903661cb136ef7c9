//! Step domain model

use crate::core::contract::{self, ContractRef};
use crate::core::{context::SharedContext, pipeline::Pipeline};
use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Boxed future returned by a step function
pub type StepFuture = BoxFuture<'static, Result<Value>>;

/// A step function: `(value, shared context) -> value`
///
/// Step functions return `anyhow::Result` so bodies can propagate arbitrary
/// error sources with `?`; the engine surfaces such errors unchanged.
pub type StepFn = Arc<dyn Fn(Value, SharedContext) -> StepFuture + Send + Sync>;

/// Classification of a step, governing dispatch
///
/// `Plain` and `Effect` dispatch identically; the two labels exist for API
/// clarity (a transform vs. a side-effecting stage). `FanOut` applies its
/// body to every element of a sequence-valued input concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Plain,
    Effect,
    FanOut,
}

/// The unit of work for a step: a function or a nested pipeline
#[derive(Clone)]
pub enum StepBody {
    /// An async function over the flowing value and the shared context
    Func(StepFn),
    /// A previously built pipeline, run recursively with the same context
    Nested(Pipeline),
}

impl StepBody {
    /// Wrap an async closure as a step body
    ///
    /// Synchronous work is expressed as an async closure that returns
    /// immediately; the engine awaits every body uniformly.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, SharedContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        StepBody::Func(Arc::new(move |value: Value, ctx: SharedContext| -> StepFuture {
            Box::pin(f(value, ctx))
        }))
    }
}

impl From<Pipeline> for StepBody {
    fn from(pipeline: Pipeline) -> Self {
        StepBody::Nested(pipeline)
    }
}

impl fmt::Debug for StepBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepBody::Func(_) => f.write_str("StepBody::Func"),
            StepBody::Nested(p) => write!(f, "StepBody::Nested({} steps)", p.len()),
        }
    }
}

/// A single step in a pipeline
#[derive(Clone)]
pub struct Step {
    /// Step name, used only for diagnostics
    pub name: String,

    /// Step kind, governing dispatch
    pub kind: StepKind,

    /// Input contract checked before the body runs
    ///
    /// For `FanOut` steps this is the element-level contract as registered;
    /// the effective gate is [`input_contract`](Self::input_contract).
    pub contract: ContractRef,

    /// The unit of work
    pub body: StepBody,

    /// Concurrency ceiling for fan-out element invocations (None = unbounded)
    pub fan_out_limit: Option<NonZeroUsize>,
}

impl Step {
    /// The contract the step's input is gated on
    ///
    /// For `FanOut` steps the registered element contract is lifted to
    /// "sequence of element", so the step as a whole always gates on a
    /// sequence. Other kinds gate on the registered contract unchanged.
    pub fn input_contract(&self) -> ContractRef {
        match self.kind {
            StepKind::FanOut => contract::sequence_of(self.contract.clone()),
            StepKind::Plain | StepKind::Effect => self.contract.clone(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("body", &self.body)
            .field("fan_out_limit", &self.fan_out_limit)
            .finish_non_exhaustive()
    }
}
