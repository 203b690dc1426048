//! Backend trait definitions

use crate::error::BackendError;
use async_trait::async_trait;
use fleet_types::{ContainerId, ContainerRef, Selector};
use std::collections::BTreeMap;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Options for container removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Kill the container if it is running
    pub force: bool,

    /// Also remove anonymous volumes attached to the container
    pub remove_volumes: bool,
}

impl RemoveOptions {
    /// Forced removal including volumes, as used on scale-down
    pub fn purge() -> Self {
        Self {
            force: true,
            remove_volumes: true,
        }
    }
}

/// Container platform operations used by the reconciler
///
/// Implementations are called concurrently and must not assume any ordering
/// between calls for different workloads.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Running containers whose labels match `selector`, in backend order
    async fn list_containers(&self, selector: &Selector) -> BackendResult<Vec<ContainerRef>>;

    /// Create (but do not start) a container
    async fn create_container(
        &self,
        image: &str,
        labels: &BTreeMap<String, String>,
    ) -> BackendResult<ContainerId>;

    /// Start a created container
    async fn start_container(&self, id: &ContainerId) -> BackendResult<()>;

    /// Remove a container
    async fn remove_container(&self, id: &ContainerId, options: RemoveOptions)
        -> BackendResult<()>;
}
