//! braid - composable, schema-validated async data pipelines
//!
//! Assemble a linear pipeline out of named steps, each gated by an input
//! contract, then derive a reusable [`Runner`] that threads a value and a
//! shared context through the steps in order. Steps come in three kinds:
//! plain transforms, side-effecting steps, and fan-out steps that apply
//! their body to every element of a sequence concurrently. A step body may
//! itself be a nested pipeline.
//!
//! ```no_run
//! use braid::{bootstrap, contract, Pipeline, StepBody};
//! use serde_json::json;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pipeline = Pipeline::builder()
//!     .effect("fetch", contract::any(), StepBody::from_fn(|_v, _ctx| async move {
//!         Ok(json!([1, 2, 3]))
//!     }))?
//!     .fan_out("square", contract::number(), StepBody::from_fn(|v, _ctx| async move {
//!         let n = v.as_i64().unwrap();
//!         Ok(json!(n * n))
//!     }))?
//!     .build();
//!
//! let out = bootstrap(&pipeline).run(json!(null)).await?;
//! assert_eq!(out, json!([1, 4, 9]));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod execution;

// Re-export commonly used types
pub use crate::core::contract;
pub use crate::core::{Contract, ContractRef, Pipeline, PipelineBuilder, SharedContext};
pub use crate::core::{Step, StepBody, StepFn, StepFuture, StepKind};
pub use crate::error::PipelineError;
pub use crate::execution::{bootstrap, Runner};
