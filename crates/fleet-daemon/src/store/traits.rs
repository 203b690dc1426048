//! Store trait definitions

use crate::error::StoreError;
use async_trait::async_trait;
use fleet_types::{DesiredState, WorkloadSpec};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Mapping from workload name to desired state
///
/// Implementations must never hold a lock beyond the duration of a single
/// call: callers perform network I/O on the values they get back.
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// Insert or wholesale replace the desired state for `spec.name`
    async fn submit(&self, spec: WorkloadSpec) -> StoreResult<DesiredState>;

    /// Remove a workload; returns whether it existed
    async fn remove(&self, name: &str) -> StoreResult<bool>;

    /// Get a workload by name
    async fn get(&self, name: &str) -> StoreResult<Option<DesiredState>>;

    /// Point-in-time copy of every workload, in no particular order
    async fn snapshot(&self) -> StoreResult<Vec<DesiredState>>;
}
