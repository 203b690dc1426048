//! Validation errors for workload submissions

use thiserror::Error;

/// Reasons a workload spec is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workload name must not be empty")]
    EmptyName,

    #[error("image reference for workload {0} must not be empty")]
    EmptyImage(String),
}
