//! Input contracts - runtime validation gates for step inputs

use serde_json::Value;
use std::sync::Arc;

/// A runtime check that a value matches an expected shape
///
/// Contracts report pass/fail without raising; the engine turns a failed
/// check into a `ValidationFailed` error naming the step. Any type with a
/// `check` method over a value qualifies; the engine does not depend on a
/// particular validation library.
pub trait Contract: Send + Sync {
    /// Check a value against the contract.
    fn check(&self, value: &Value) -> bool;
}

/// Shared handle to a contract, cloneable across steps and pipelines
pub type ContractRef = Arc<dyn Contract>;

/// Any bare predicate over a value is a contract.
impl<F> Contract for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn check(&self, value: &Value) -> bool {
        self(value)
    }
}

/// Lifts an element-level contract to "sequence of element"
///
/// Fan-out steps store their contract in this form: the step receives the
/// whole sequence, so the gate must hold for every element.
pub struct SequenceOf(pub ContractRef);

impl Contract for SequenceOf {
    fn check(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().all(|item| self.0.check(item)),
            _ => false,
        }
    }
}

/// Accepts any value
pub fn any() -> ContractRef {
    Arc::new(|_: &Value| true)
}

/// Accepts only `null`
pub fn null() -> ContractRef {
    Arc::new(|value: &Value| value.is_null())
}

/// Accepts any boolean
pub fn boolean() -> ContractRef {
    Arc::new(|value: &Value| value.is_boolean())
}

/// Accepts any number
pub fn number() -> ContractRef {
    Arc::new(|value: &Value| value.is_number())
}

/// Accepts any string
pub fn string() -> ContractRef {
    Arc::new(|value: &Value| value.is_string())
}

/// Accepts any object
pub fn object() -> ContractRef {
    Arc::new(|value: &Value| value.is_object())
}

/// Accepts any sequence, regardless of element shape
pub fn sequence() -> ContractRef {
    Arc::new(|value: &Value| value.is_array())
}

/// Accepts a sequence whose every element satisfies `element`
pub fn sequence_of(element: ContractRef) -> ContractRef {
    Arc::new(SequenceOf(element))
}

/// Builds a contract from an arbitrary predicate
pub fn satisfies<F>(predicate: F) -> ContractRef
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(predicate)
}
