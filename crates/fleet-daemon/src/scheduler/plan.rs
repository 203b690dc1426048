//! Convergence planning
//!
//! Pure functions deciding what a reconciliation pass does for one workload.

use fleet_types::{ContainerRef, ObservedStatus};
use serde::{Deserialize, Serialize};

/// Which containers survive a scale-down
///
/// Backend listing order is not guaranteed, so the default orders by
/// creation time. Every policy removes exactly `current - desired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDownPolicy {
    /// Keep the longest-running containers
    #[default]
    KeepOldest,

    /// Keep the most recently created containers
    KeepNewest,

    /// Keep the first containers in backend-returned order
    BackendOrder,
}

impl ScaleDownPolicy {
    /// Containers ordered by retention priority; the first `desired` are kept
    pub fn order(&self, containers: &[ContainerRef]) -> Vec<ContainerRef> {
        let mut ordered = containers.to_vec();
        match self {
            ScaleDownPolicy::KeepOldest => {
                ordered.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)))
            }
            ScaleDownPolicy::KeepNewest => {
                ordered.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)))
            }
            ScaleDownPolicy::BackendOrder => {}
        }
        ordered
    }
}

/// Corrective action for one workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalePlan {
    /// Observed count matches desired count
    Steady,

    /// Create and start `count` containers
    ScaleUp { count: usize },

    /// Remove these containers
    ScaleDown { remove: Vec<ContainerRef> },
}

impl ScalePlan {
    pub fn for_status(status: &ObservedStatus, policy: ScaleDownPolicy) -> Self {
        let desired = status.desired_count as usize;
        let current = status.containers.len();

        if current < desired {
            ScalePlan::ScaleUp {
                count: desired - current,
            }
        } else if current > desired {
            let remove = policy
                .order(&status.containers)
                .into_iter()
                .skip(desired)
                .collect();
            ScalePlan::ScaleDown { remove }
        } else {
            ScalePlan::Steady
        }
    }

    pub fn creates(&self) -> usize {
        match self {
            ScalePlan::ScaleUp { count } => *count,
            _ => 0,
        }
    }

    pub fn removals(&self) -> usize {
        match self {
            ScalePlan::ScaleDown { remove } => remove.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::{ContainerId, DesiredState, WorkloadSpec};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn status(desired: u32, containers: Vec<ContainerRef>) -> ObservedStatus {
        let state = DesiredState::from_spec(WorkloadSpec::new("web", "nginx", desired)).unwrap();
        ObservedStatus::new(&state, containers)
    }

    /// Backend order c0..cN with creation times running backwards
    fn listed(count: usize) -> Vec<ContainerRef> {
        (0..count)
            .map(|i| ContainerRef::new(format!("c{i}"), "nginx", 100 - i as i64))
            .collect()
    }

    fn ids(containers: &[ContainerRef]) -> Vec<&str> {
        containers.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_steady() {
        assert_eq!(
            ScalePlan::for_status(&status(2, listed(2)), ScaleDownPolicy::default()),
            ScalePlan::Steady
        );
        assert_eq!(
            ScalePlan::for_status(&status(0, Vec::new()), ScaleDownPolicy::default()),
            ScalePlan::Steady
        );
    }

    #[test]
    fn test_scale_up() {
        let plan = ScalePlan::for_status(&status(3, listed(1)), ScaleDownPolicy::default());
        assert_eq!(plan, ScalePlan::ScaleUp { count: 2 });
        assert_eq!(plan.creates(), 2);
        assert_eq!(plan.removals(), 0);
    }

    #[test]
    fn test_backend_order_keeps_first_listed() {
        let plan = ScalePlan::for_status(&status(2, listed(5)), ScaleDownPolicy::BackendOrder);
        match plan {
            ScalePlan::ScaleDown { remove } => assert_eq!(ids(&remove), ["c2", "c3", "c4"]),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_keep_oldest_removes_newest() {
        let plan = ScalePlan::for_status(&status(2, listed(5)), ScaleDownPolicy::KeepOldest);
        match plan {
            ScalePlan::ScaleDown { remove } => assert_eq!(ids(&remove), ["c2", "c1", "c0"]),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_keep_newest_removes_oldest() {
        let plan = ScalePlan::for_status(&status(2, listed(5)), ScaleDownPolicy::KeepNewest);
        match plan {
            ScalePlan::ScaleDown { remove } => assert_eq!(ids(&remove), ["c2", "c3", "c4"]),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_id() {
        let containers = vec![
            ContainerRef::new("b", "nginx", 7),
            ContainerRef::new("a", "nginx", 7),
        ];
        let ordered = ScaleDownPolicy::KeepOldest.order(&containers);
        assert_eq!(ids(&ordered), ["a", "b"]);
    }

    fn arb_policy() -> impl Strategy<Value = ScaleDownPolicy> {
        prop_oneof![
            Just(ScaleDownPolicy::KeepOldest),
            Just(ScaleDownPolicy::KeepNewest),
            Just(ScaleDownPolicy::BackendOrder),
        ]
    }

    fn arb_containers() -> impl Strategy<Value = Vec<ContainerRef>> {
        prop::collection::vec(0i64..50, 0..20).prop_map(|created| {
            created
                .into_iter()
                .enumerate()
                .map(|(i, ts)| ContainerRef::new(format!("c{i}"), "nginx", ts))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_plan_closes_the_gap_exactly(
            desired in 0u32..20,
            containers in arb_containers(),
            policy in arb_policy(),
        ) {
            let current = containers.len();
            let plan = ScalePlan::for_status(&status(desired, containers.clone()), policy);

            prop_assert_eq!(plan.creates(), (desired as usize).saturating_sub(current));
            prop_assert_eq!(plan.removals(), current.saturating_sub(desired as usize));

            if let ScalePlan::ScaleDown { remove } = &plan {
                let observed: HashSet<&ContainerId> = containers.iter().map(|c| &c.id).collect();
                let removed: HashSet<&ContainerId> = remove.iter().map(|c| &c.id).collect();
                prop_assert_eq!(removed.len(), remove.len());
                prop_assert!(removed.is_subset(&observed));

                if policy == ScaleDownPolicy::BackendOrder {
                    prop_assert_eq!(remove.as_slice(), &containers[desired as usize..]);
                }
            }
        }
    }
}
