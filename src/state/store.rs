use crate::error::Result;
use crate::state::StateStore;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// In-memory state store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Arc<DashMap<(String, String), Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored values across all namespaces
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .entries
            .get(&(namespace.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        self.entries
            .insert((namespace.to_string(), key.to_string()), value);

        tracing::debug!(namespace = namespace, key = key, "Value stored");
        Ok(())
    }
}
