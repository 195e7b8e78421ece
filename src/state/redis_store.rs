use crate::error::{AppError, Result};
use crate::state::StateStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;

/// Redis-based persistent state store
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    /// Create a new Redis store
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::new_with_prefix(redis_url, "incident-flow").await
    }

    /// Create a new Redis store with custom key prefix
    pub async fn new_with_prefix(redis_url: &str, prefix: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Store(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to Redis: {}", e)))?;

        // Test connection
        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(|e| AppError::Store(format!("Redis connection test failed: {}", e)))?;

        tracing::info!("Initialized Redis store with prefix '{}'", prefix);

        Ok(Self {
            connection,
            key_prefix: prefix.to_string(),
        })
    }

    fn key(&self, namespace: &str, key: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, namespace, key)
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn
            .get(self.key(namespace, key))
            .await
            .map_err(|e| AppError::Store(format!("Failed to read {}/{}: {}", namespace, key, e)))?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(&value)?;

        let _: () = conn
            .set(self.key(namespace, key), json)
            .await
            .map_err(|e| AppError::Store(format!("Failed to write {}/{}: {}", namespace, key, e)))?;

        tracing::debug!(namespace = namespace, key = key, "Value stored in Redis");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_a_store_error() {
        let result = RedisStore::new("not a url").await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
