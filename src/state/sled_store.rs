use crate::error::{AppError, Result};
use crate::state::StateStore;
use async_trait::async_trait;
use serde_json::Value;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Persistent state store using the Sled embedded database.
///
/// Each namespace maps to its own tree; values are stored as JSON bytes.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
}

impl SledStore {
    /// Create a new Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)
            .map_err(|e| AppError::Store(format!("Failed to open Sled database: {}", e)))?;

        tracing::info!("Initialized Sled store at {:?}", path_ref);

        Ok(Self { db: Arc::new(db) })
    }

    fn tree(&self, namespace: &str) -> Result<sled::Tree> {
        self.db.open_tree(namespace).map_err(|e| {
            AppError::Store(format!("Failed to open tree '{}': {}", namespace, e))
        })
    }

    /// Flush all pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Store(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SledStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        let tree = self.tree(namespace)?;

        match tree
            .get(key.as_bytes())
            .map_err(|e| AppError::Store(format!("Failed to read {}/{}: {}", namespace, key, e)))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let tree = self.tree(namespace)?;
        let bytes = serde_json::to_vec(&value)?;

        tree.insert(key.as_bytes(), bytes)
            .map_err(|e| AppError::Store(format!("Failed to write {}/{}: {}", namespace, key, e)))?;

        tracing::debug!(namespace = namespace, key = key, "Value stored in Sled");
        Ok(())
    }
}
