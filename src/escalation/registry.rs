use crate::error::{AppError, Result};
use crate::metrics::LIFECYCLE_METRICS;
use crate::state::{StateStore, ESCALATION_NAMESPACE, PENDING_IDS_KEY};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

enum RegistryCommand {
    Register {
        incident_id: String,
        respond: oneshot::Sender<Result<bool>>,
    },
    Remove {
        incident_ids: Vec<String>,
        respond: oneshot::Sender<Result<usize>>,
    },
    Snapshot {
        respond: oneshot::Sender<Vec<String>>,
    },
}

/// Handle to the pending-escalation set.
///
/// A single actor task owns the ordered id list and is the only writer of
/// the persisted (`escalation`, `pendingIds`) value. Registrations and
/// removals are applied one at a time, so an id registered while a sweep is
/// running cannot be overwritten by the sweep's write.
#[derive(Clone)]
pub struct EscalationRegistry {
    tx: mpsc::Sender<RegistryCommand>,
}

impl EscalationRegistry {
    /// Load the persisted pending list and start the owning task
    pub async fn spawn(store: Arc<dyn StateStore>, buffer: usize) -> Result<Self> {
        let pending = load_pending(store.as_ref()).await?;
        info!(pending = pending.len(), "Escalation registry loaded");
        LIFECYCLE_METRICS.pending_escalations.set(pending.len() as f64);

        let (tx, rx) = mpsc::channel(buffer.max(1));
        let actor = RegistryActor { store, pending, rx };
        tokio::spawn(actor.run());

        Ok(Self { tx })
    }

    /// Add an id to the pending set. Returns `false` if it was already present.
    pub async fn register(&self, incident_id: &str) -> Result<bool> {
        let (respond, rx) = oneshot::channel();
        self.send(RegistryCommand::Register {
            incident_id: incident_id.to_string(),
            respond,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Remove every occurrence of the given ids. Ids not in the set are ignored.
    pub async fn remove(&self, incident_ids: Vec<String>) -> Result<usize> {
        let (respond, rx) = oneshot::channel();
        self.send(RegistryCommand::Remove {
            incident_ids,
            respond,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Current pending ids in registration order
    pub async fn snapshot(&self) -> Result<Vec<String>> {
        let (respond, rx) = oneshot::channel();
        self.send(RegistryCommand::Snapshot { respond }).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, command: RegistryCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> AppError {
    AppError::Internal("escalation registry is not running".to_string())
}

async fn load_pending(store: &dyn StateStore) -> Result<Vec<String>> {
    match store.get(ESCALATION_NAMESPACE, PENDING_IDS_KEY).await? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id),
                other => {
                    warn!(value = %other, "Ignoring non-string pending escalation id");
                    None
                }
            })
            .collect()),
        Some(other) => {
            warn!(value = %other, "Pending escalation set is not a list, starting empty");
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

struct RegistryActor {
    store: Arc<dyn StateStore>,
    pending: Vec<String>,
    rx: mpsc::Receiver<RegistryCommand>,
}

impl RegistryActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                RegistryCommand::Register {
                    incident_id,
                    respond,
                } => {
                    let _ = respond.send(self.register(incident_id).await);
                }
                RegistryCommand::Remove {
                    incident_ids,
                    respond,
                } => {
                    let _ = respond.send(self.remove(incident_ids).await);
                }
                RegistryCommand::Snapshot { respond } => {
                    let _ = respond.send(self.pending.clone());
                }
            }
        }

        debug!("Escalation registry stopped");
    }

    async fn register(&mut self, incident_id: String) -> Result<bool> {
        if self.pending.contains(&incident_id) {
            debug!(incident_id = %incident_id, "Incident already pending escalation");
            return Ok(false);
        }

        let mut next = self.pending.clone();
        next.push(incident_id.clone());
        self.commit(next).await?;

        debug!(incident_id = %incident_id, pending = self.pending.len(), "Registered for escalation");
        Ok(true)
    }

    async fn remove(&mut self, incident_ids: Vec<String>) -> Result<usize> {
        let doomed: HashSet<String> = incident_ids.into_iter().collect();
        let next: Vec<String> = self
            .pending
            .iter()
            .filter(|id| !doomed.contains(*id))
            .cloned()
            .collect();

        let removed = self.pending.len() - next.len();
        if removed > 0 {
            self.commit(next).await?;
        }
        Ok(removed)
    }

    /// Persist the new list, then make it current. A failed write leaves the
    /// in-memory list unchanged.
    async fn commit(&mut self, next: Vec<String>) -> Result<()> {
        self.store
            .set(
                ESCALATION_NAMESPACE,
                PENDING_IDS_KEY,
                serde_json::to_value(&next)?,
            )
            .await?;

        self.pending = next;
        LIFECYCLE_METRICS
            .pending_escalations
            .set(self.pending.len() as f64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn persisted(store: &InMemoryStore) -> Value {
        store
            .get(ESCALATION_NAMESPACE, PENDING_IDS_KEY)
            .await
            .unwrap()
            .unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_register_persists_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let registry = EscalationRegistry::spawn(store.clone(), 8).await.unwrap();

        assert!(registry.register("a").await.unwrap());
        assert!(registry.register("b").await.unwrap());

        assert_eq!(registry.snapshot().await.unwrap(), vec!["a", "b"]);
        assert_eq!(persisted(&store).await, json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let registry = EscalationRegistry::spawn(store.clone(), 8).await.unwrap();

        assert!(registry.register("a").await.unwrap());
        assert!(!registry.register("a").await.unwrap());
        assert_eq!(registry.snapshot().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_remove_only_named_ids() {
        let store = Arc::new(InMemoryStore::new());
        let registry = EscalationRegistry::spawn(store.clone(), 8).await.unwrap();

        for id in ["a", "b", "c"] {
            registry.register(id).await.unwrap();
        }

        let removed = registry
            .remove(vec!["b".to_string(), "zzz".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(registry.snapshot().await.unwrap(), vec!["a", "c"]);
        assert_eq!(persisted(&store).await, json!(["a", "c"]));
    }

    #[tokio::test]
    async fn test_loads_persisted_list_with_duplicates() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(ESCALATION_NAMESPACE, PENDING_IDS_KEY, json!(["x", "y", "x", 7]))
            .await
            .unwrap();

        let registry = EscalationRegistry::spawn(store.clone(), 8).await.unwrap();
        assert_eq!(registry.snapshot().await.unwrap(), vec!["x", "y", "x"]);

        assert_eq!(registry.remove(vec!["x".to_string()]).await.unwrap(), 2);
        assert_eq!(registry.snapshot().await.unwrap(), vec!["y"]);
    }

    #[tokio::test]
    async fn test_non_list_value_starts_empty() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(ESCALATION_NAMESPACE, PENDING_IDS_KEY, json!({"oops": true}))
            .await
            .unwrap();

        let registry = EscalationRegistry::spawn(store, 8).await.unwrap();
        assert!(registry.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_not_lost() {
        let store = Arc::new(InMemoryStore::new());
        let registry = EscalationRegistry::spawn(store.clone(), 4).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register(&format!("inc-{}", i)).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(registry.snapshot().await.unwrap().len(), 50);
        assert_eq!(persisted(&store).await.as_array().unwrap().len(), 50);
    }

    struct FlakyStore {
        inner: InMemoryStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl StateStore for FlakyStore {
        async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
            self.inner.get(namespace, key).await
        }

        async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Store("write refused".to_string()));
            }
            self.inner.set(namespace, key, value).await
        }
    }

    #[tokio::test]
    async fn test_failed_write_surfaces_and_leaves_set_unchanged() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryStore::new(),
            fail_writes: AtomicBool::new(false),
        });
        let registry = EscalationRegistry::spawn(store.clone(), 8).await.unwrap();
        registry.register("a").await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = registry.register("b").await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(registry.snapshot().await.unwrap(), vec!["a"]);
    }
}
