//! Pipeline execution

pub mod engine;

pub use engine::{bootstrap, Runner};
