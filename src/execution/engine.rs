//! Execution engine - derives a reusable runner from a pipeline definition

use crate::core::{Pipeline, SharedContext, Step, StepBody, StepKind};
use crate::error::PipelineError;
use futures::future::{try_join_all, BoxFuture};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// Derive a runner for a pipeline
///
/// Cheap and stateless: the runner shares the pipeline's steps and carries
/// nothing between invocations.
pub fn bootstrap(pipeline: &Pipeline) -> Runner {
    Runner::new(pipeline.clone())
}

/// A reusable callable bound to exactly one pipeline
///
/// May be invoked repeatedly with different initial values and contexts.
/// Each run walks the steps strictly left-to-right, gating every step on its
/// input contract and dispatching by kind. The first failure of any kind
/// terminates the run and becomes its outcome; nothing is retried or
/// recovered internally.
pub struct Runner {
    pipeline: Pipeline,
}

impl Runner {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Run the pipeline with an empty shared context
    pub async fn run(&self, initial: Value) -> Result<Value, PipelineError> {
        self.run_with(initial, SharedContext::new()).await
    }

    /// Run the pipeline, threading `initial` through every step
    ///
    /// The same `context` instance is handed to every step body, including
    /// nested pipelines and every fan-out element.
    pub async fn run_with(
        &self,
        initial: Value,
        context: SharedContext,
    ) -> Result<Value, PipelineError> {
        let run_id = Uuid::new_v4();
        debug!("starting pipeline run {} ({} steps)", run_id, self.pipeline.len());

        let result = run_steps(self.pipeline.clone(), initial, context).await;

        match &result {
            Ok(_) => debug!("pipeline run {} finished", run_id),
            Err(e) => warn!("pipeline run {} failed: {}", run_id, e),
        }
        result
    }
}

impl Pipeline {
    /// Shorthand for [`bootstrap`]
    pub fn runner(&self) -> Runner {
        bootstrap(self)
    }
}

// Boxed because nested-pipeline bodies recurse back into this function.
fn run_steps(
    pipeline: Pipeline,
    initial: Value,
    context: SharedContext,
) -> BoxFuture<'static, Result<Value, PipelineError>> {
    Box::pin(async move {
        let mut current = initial;

        for step in pipeline.steps() {
            current = match step.kind {
                StepKind::Plain | StepKind::Effect => {
                    if !step.contract.check(&current) {
                        return Err(PipelineError::ValidationFailed {
                            step: step.name.clone(),
                            value: render(&current),
                        });
                    }

                    debug!("executing step: {}", step.name);
                    apply(&step.body, current, &context).await?
                }
                StepKind::FanOut => {
                    // Shape before contents: a fan-out over a non-sequence
                    // is a type mismatch, not a validation failure.
                    let items = match current {
                        Value::Array(items) => items,
                        other => {
                            return Err(PipelineError::TypeMismatch {
                                step: step.name.clone(),
                                value: render(&other),
                            })
                        }
                    };

                    // Element-level gate; fan-out contracts are stored at
                    // the element level and lifted via Step::input_contract.
                    if let Some(offender) = items.iter().find(|item| !step.contract.check(item)) {
                        return Err(PipelineError::ValidationFailed {
                            step: step.name.clone(),
                            value: render(offender),
                        });
                    }

                    debug!("executing step: {}", step.name);
                    fan_out(step, items, &context).await?
                }
            };
        }

        Ok(current)
    })
}

/// Invoke a step body once, awaiting function bodies and recursing into
/// nested pipelines with the same context
async fn apply(
    body: &StepBody,
    value: Value,
    context: &SharedContext,
) -> Result<Value, PipelineError> {
    match body {
        StepBody::Func(f) => f(value, context.clone()).await.map_err(PipelineError::Step),
        StepBody::Nested(nested) => run_steps(nested.clone(), value, context.clone()).await,
    }
}

/// Apply a fan-out step's body to every element of a sequence
///
/// All element invocations share the one context. Results are collected in
/// input order regardless of completion order. The first element failure
/// fails the step as a whole; in-flight siblings are dropped and their
/// results discarded.
async fn fan_out(
    step: &Step,
    items: Vec<Value>,
    context: &SharedContext,
) -> Result<Value, PipelineError> {
    debug!("fanning out step {} over {} elements", step.name, items.len());
    let calls = items.into_iter().map(|item| apply(&step.body, item, context));

    let results = match step.fan_out_limit {
        None => try_join_all(calls).await?,
        Some(limit) => {
            stream::iter(calls)
                .buffered(limit.get())
                .try_collect::<Vec<Value>>()
                .await?
        }
    };

    Ok(Value::Array(results))
}

const RENDERED_VALUE_MAX: usize = 256;

/// Compact representation of a rejected value for error messages
fn render(value: &Value) -> String {
    let mut repr = value.to_string();
    if repr.len() > RENDERED_VALUE_MAX {
        let cut = (0..=RENDERED_VALUE_MAX)
            .rev()
            .find(|&i| repr.is_char_boundary(i))
            .unwrap_or(0);
        repr.truncate(cut);
        repr.push_str("...");
    }
    repr
}
