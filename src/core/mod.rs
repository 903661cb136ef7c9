//! Core domain models
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, contracts, and the shared run context.

pub mod contract;
pub mod context;
pub mod pipeline;
pub mod step;

pub use contract::{Contract, ContractRef};
pub use context::SharedContext;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use step::{Step, StepBody, StepFn, StepFuture, StepKind};
