//! Orchestration backend clients
//!
//! The reconciler only needs four operations from the container platform:
//! list by label, create, start and remove. [`ContainerBackend`] captures
//! exactly that; [`DockerBackend`] speaks the Docker Engine API (which a
//! Swarm manager also serves) and [`InMemoryBackend`] is a process-local
//! fake for development mode and tests.

mod docker;
mod memory;
mod traits;

pub use docker::{resolve_base_url, DockerBackend};
pub use memory::{BackendCall, InMemoryBackend};
pub use traits::{BackendResult, ContainerBackend, RemoveOptions};

use crate::config::{BackendConfig, BackendDriver, TlsConfig};
use std::sync::Arc;

/// Build the backend selected by configuration
pub fn connect(
    config: &BackendConfig,
    tls: &TlsConfig,
) -> BackendResult<Arc<dyn ContainerBackend>> {
    match config.driver {
        BackendDriver::Docker => Ok(Arc::new(DockerBackend::from_config(config, tls)?)),
        BackendDriver::Memory => {
            tracing::warn!("Using in-memory backend; no real containers will be managed");
            Ok(Arc::new(InMemoryBackend::new()))
        }
    }
}
