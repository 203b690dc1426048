//! Scheduler and reconciliation loop
//!
//! The scheduler is responsible for:
//! - Periodically comparing desired state with the containers on the backend
//! - Creating and starting containers when a workload is below its count
//! - Removing containers when a workload is above its count

mod plan;
mod reconciler;

pub use plan::{ScaleDownPolicy, ScalePlan};
pub use reconciler::{ReconcileReport, Reconciler};
