//! In-memory store implementation

use super::traits::*;
use async_trait::async_trait;
use fleet_types::{DesiredState, WorkloadSpec};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory desired-state store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    workloads: Arc<RwLock<HashMap<String, DesiredState>>>,
}

impl InMemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.workloads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workloads.read().await.is_empty()
    }
}

#[async_trait]
impl DesiredStateStore for InMemoryStore {
    async fn submit(&self, spec: WorkloadSpec) -> StoreResult<DesiredState> {
        // Built before taking the lock so readers never see a partial entry
        let state = DesiredState::from_spec(spec)?;

        let mut workloads = self.workloads.write().await;
        workloads.insert(state.name().to_string(), state.clone());

        Ok(state)
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        let mut workloads = self.workloads.write().await;
        Ok(workloads.remove(name).is_some())
    }

    async fn get(&self, name: &str) -> StoreResult<Option<DesiredState>> {
        let workloads = self.workloads.read().await;
        Ok(workloads.get(name).cloned())
    }

    async fn snapshot(&self) -> StoreResult<Vec<DesiredState>> {
        let workloads = self.workloads.read().await;
        Ok(workloads.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_submit_is_visible_in_snapshot() {
        let store = InMemoryStore::new();
        let spec = WorkloadSpec::new("web", "nginx:1.27", 3);

        let stored = store.submit(spec.clone()).await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0], stored);
        assert_eq!(snapshot[0].spec(), spec);
    }

    #[tokio::test]
    async fn test_resubmit_replaces_wholesale() {
        let store = InMemoryStore::new();

        store.submit(WorkloadSpec::new("web", "a", 1)).await.unwrap();
        store.submit(WorkloadSpec::new("web", "b", 2)).await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].image(), "b");
        assert_eq!(snapshot[0].replicas(), 2);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_name() {
        let store = InMemoryStore::new();

        let result = store.submit(WorkloadSpec::new("", "nginx", 1)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let store = InMemoryStore::new();
        store.submit(WorkloadSpec::new("web", "nginx", 1)).await.unwrap();

        let removed = store.remove("absent").await.unwrap();
        assert!(!removed);
        assert_eq!(store.len().await, 1);

        assert!(store.remove("web").await.unwrap());
        assert!(store.get("web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_copy() {
        let store = InMemoryStore::new();
        store.submit(WorkloadSpec::new("web", "nginx", 1)).await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        store.remove("web").await.unwrap();
        store.submit(WorkloadSpec::new("api", "api:2", 4)).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name(), "web");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_operations_lose_no_updates() {
        let store = InMemoryStore::new();
        let mut handles = Vec::new();

        for i in 0..64u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("workload-{i}");
                store
                    .submit(WorkloadSpec::new(name.clone(), "nginx", i))
                    .await
                    .unwrap();
                // Odd workloads are removed again
                if i % 2 == 1 {
                    assert!(store.remove(&name).await.unwrap());
                }
                store.snapshot().await.unwrap().len()
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 32);
        for state in snapshot {
            let index: u32 = state.name().trim_start_matches("workload-").parse().unwrap();
            assert_eq!(index % 2, 0);
            assert_eq!(state.replicas(), index);
        }
    }
}
