use crate::config::{StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{InMemoryStore, RedisStore, SledStore, StateStore};
use std::sync::Arc;

/// Create a state store based on configuration
pub async fn create_store(config: &StateConfig) -> Result<Arc<dyn StateStore>> {
    match config.backend {
        StateBackend::Memory => Ok(create_in_memory_store()),

        StateBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled storage backend");

            let store = SledStore::new(path)?;
            Ok(Arc::new(store))
        }

        StateBackend::Redis => {
            let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Redis backend requires 'redis_url' configuration".to_string(),
                )
            })?;

            tracing::info!(url = %redis_url, "Initializing Redis storage backend");

            let store = RedisStore::new_with_prefix(redis_url, &config.key_prefix).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn StateStore> {
    tracing::info!("Initializing in-memory storage backend");
    Arc::new(InMemoryStore::new())
}
