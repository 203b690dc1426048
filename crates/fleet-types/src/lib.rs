//! Fleet Types - Core types for the replica controller
//!
//! The controller keeps named container workloads at an operator-declared
//! replica count on a Docker-compatible backend. These types are shared by
//! the store, the reconciler and the REST surface.
//!
//! ## Key Concepts
//!
//! - **WorkloadSpec**: What an operator submits (name, image, replica count)
//! - **DesiredState**: A validated spec plus its derived label selector
//! - **Selector**: The label that correlates a workload with its containers
//! - **ContainerRef**: A container as reported by the backend
//! - **ObservedStatus**: Desired vs. current state of one workload

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod container;
pub mod error;
pub mod selector;
pub mod status;
pub mod workload;

// Re-export main types
pub use container::{ContainerId, ContainerRef};
pub use error::ValidationError;
pub use selector::{Selector, WORKLOAD_LABEL};
pub use status::ObservedStatus;
pub use workload::{DesiredState, WorkloadSpec};
