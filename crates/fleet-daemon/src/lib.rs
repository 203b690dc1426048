//! Fleet daemon library
//!
//! This module provides the core components for the fleet daemon:
//! - Desired-state store
//! - Orchestration backend clients
//! - Reconciliation loop
//! - REST control surface, mutual TLS and server lifecycle

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod tls;

pub use backend::{ContainerBackend, DockerBackend, InMemoryBackend};
pub use config::DaemonConfig;
pub use error::{ApiError, BackendError, DaemonError, StoreError};
pub use scheduler::Reconciler;
pub use server::Server;
pub use store::{DesiredStateStore, InMemoryStore};
