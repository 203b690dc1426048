//! Desired-state store for fleet-daemon
//!
//! Holds the operator-declared state of every workload. Process memory only;
//! nothing survives a restart.

mod memory;
mod traits;

pub use memory::InMemoryStore;
pub use traits::{DesiredStateStore, StoreResult};
