pub mod store;
pub mod sled_store;
pub mod redis_store;
pub mod factory;
pub mod incidents;

pub use store::*;
pub use sled_store::SledStore;
pub use redis_store::RedisStore;
pub use factory::{create_store, create_in_memory_store};
pub use incidents::IncidentRepository;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Namespace holding one record per incident id
pub const INCIDENTS_NAMESPACE: &str = "incidents";

/// Namespace holding escalation bookkeeping
pub const ESCALATION_NAMESPACE: &str = "escalation";

/// Key of the pending-escalation id list inside [`ESCALATION_NAMESPACE`]
pub const PENDING_IDS_KEY: &str = "pendingIds";

/// Namespaced key/value persistence.
///
/// `set` replaces the whole value. There are no partial updates, no
/// transactions and no locking primitive; callers that need read-modify-write
/// must tolerate last-write-wins.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the value stored under (namespace, key)
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under (namespace, key)
    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()>;
}
