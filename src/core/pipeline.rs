//! Pipeline domain model and builder

use crate::core::contract::ContractRef;
use crate::core::step::{Step, StepBody, StepKind};
use crate::error::PipelineError;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// An immutable, ordered sequence of steps
///
/// Built once via [`PipelineBuilder`]; never mutated afterward. Execution
/// proceeds strictly left-to-right. Cloning is cheap and shares the steps,
/// so a pipeline can be embedded as the body of a step in another pipeline
/// with no depth limit.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Arc<[Step]>,
}

impl Pipeline {
    /// Start building a new pipeline
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The steps in registration order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the pipeline has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Chainable construction API for [`Pipeline`]
///
/// Registration methods consume the builder and return it by value.
/// Registration is fallible: an unusable body is rejected at the call site,
/// not at run time.
///
/// ```no_run
/// use braid::{contract, Pipeline, StepBody};
/// use serde_json::json;
///
/// # fn main() -> Result<(), braid::PipelineError> {
/// let pipeline = Pipeline::builder()
///     .plain("double", contract::number(), StepBody::from_fn(|v, _ctx| async move {
///         Ok(json!(v.as_f64().unwrap() * 2.0))
///     }))?
///     .build();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    steps: Vec<Step>,
}

impl PipelineBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain transform step
    pub fn plain(
        self,
        name: impl Into<String>,
        contract: ContractRef,
        body: impl Into<StepBody>,
    ) -> Result<Self, PipelineError> {
        self.push(name.into(), StepKind::Plain, contract, body.into(), None)
    }

    /// Register a side-effecting step
    ///
    /// Dispatches identically to [`plain`](Self::plain); the label documents
    /// intent (IO, logging, loading) rather than changing behavior. The
    /// body's return value still replaces the flowing value.
    pub fn effect(
        self,
        name: impl Into<String>,
        contract: ContractRef,
        body: impl Into<StepBody>,
    ) -> Result<Self, PipelineError> {
        self.push(name.into(), StepKind::Effect, contract, body.into(), None)
    }

    /// Register a fan-out step applying `body` to every element of a
    /// sequence-valued input, concurrently and without a concurrency ceiling
    ///
    /// `element_contract` describes one element; the step's effective gate
    /// is its "sequence of element" lift ([`Step::input_contract`]), so the
    /// step as a whole always gates on a sequence.
    pub fn fan_out(
        self,
        name: impl Into<String>,
        element_contract: ContractRef,
        body: impl Into<StepBody>,
    ) -> Result<Self, PipelineError> {
        self.push(name.into(), StepKind::FanOut, element_contract, body.into(), None)
    }

    /// Register a fan-out step with at most `limit` element invocations in
    /// flight at once
    ///
    /// Same ordering and fail-fast behavior as [`fan_out`](Self::fan_out);
    /// only the concurrency ceiling differs.
    pub fn fan_out_bounded(
        self,
        name: impl Into<String>,
        element_contract: ContractRef,
        limit: NonZeroUsize,
        body: impl Into<StepBody>,
    ) -> Result<Self, PipelineError> {
        self.push(
            name.into(),
            StepKind::FanOut,
            element_contract,
            body.into(),
            Some(limit),
        )
    }

    /// Freeze the accumulated steps into an immutable pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            steps: self.steps.into(),
        }
    }

    fn push(
        mut self,
        name: String,
        kind: StepKind,
        contract: ContractRef,
        body: StepBody,
        fan_out_limit: Option<NonZeroUsize>,
    ) -> Result<Self, PipelineError> {
        // The type system already rules out bodies that are neither a step
        // function nor a pipeline; an empty nested pipeline is the one
        // representable invalid shape.
        if let StepBody::Nested(nested) = &body {
            if nested.is_empty() {
                return Err(PipelineError::InvalidStepBody {
                    step: name,
                    reason: "nested pipeline has no steps".to_string(),
                });
            }
        }

        self.steps.push(Step {
            name,
            kind,
            contract,
            body,
            fan_out_limit,
        });
        Ok(self)
    }
}
