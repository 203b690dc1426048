//! Observed status of a workload

use crate::{ContainerRef, DesiredState};
use serde::{Deserialize, Serialize};

/// Desired vs. current state of one workload at one point in time
///
/// Computed fresh for every reconciliation pass and status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObservedStatus {
    pub name: String,
    pub image: String,
    pub desired_count: u32,
    pub current_count: usize,
    /// Selector labels used to find the containers
    pub labels: Vec<String>,
    /// Containers in the order the backend returned them
    pub containers: Vec<ContainerRef>,
}

impl ObservedStatus {
    pub fn new(state: &DesiredState, containers: Vec<ContainerRef>) -> Self {
        Self {
            name: state.name().to_string(),
            image: state.image().to_string(),
            desired_count: state.replicas(),
            current_count: containers.len(),
            labels: vec![state.selector().label()],
            containers,
        }
    }

    /// Desired minus current; positive means scale up
    pub fn delta(&self) -> i64 {
        i64::from(self.desired_count) - self.current_count as i64
    }

    pub fn is_converged(&self) -> bool {
        self.delta() == 0
    }
}
