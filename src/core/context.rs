//! Shared context - mutable key/value state visible to every step in a run

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mutable key/value state shared by every step body across a run
///
/// The caller supplies one context per run (default: empty) and the engine
/// hands the same instance to every step invocation, including nested
/// pipelines and every fan-out element. Cloning shares the underlying map;
/// it does not copy. The engine itself never writes to the context.
///
/// Individual reads and writes are serialized through an `RwLock`, so the
/// map cannot be corrupted by concurrent fan-out siblings. Compound
/// read-modify-write sequences are not atomic: concurrent writers to the
/// same key resolve as last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl SharedContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key, cloning it out of the map
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.get(key).cloned()
    }

    /// Insert a value, returning the previous value for the key if any
    pub async fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().await.insert(key.into(), value)
    }

    /// Remove a key, returning its value if present
    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().await.remove(key)
    }

    /// Check whether a key is present
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.read().await.contains_key(key)
    }

    /// Clone the current contents of the context
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.read().await.clone()
    }
}

impl From<HashMap<String, Value>> for SharedContext {
    fn from(map: HashMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }
}
