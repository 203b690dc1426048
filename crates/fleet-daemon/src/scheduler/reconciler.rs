//! Reconciliation loop

use super::plan::ScalePlan;
use crate::backend::{ContainerBackend, RemoveOptions};
use crate::config::SchedulerConfig;
use crate::store::{DesiredStateStore, StoreResult};
use fleet_types::{ContainerRef, DesiredState, ObservedStatus};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Workloads in the snapshot
    pub workloads: usize,
    /// Workloads skipped because their listing failed
    pub skipped: usize,
    pub created: usize,
    pub started: usize,
    pub removed: usize,
    /// One entry per failed backend operation
    pub failures: Vec<String>,
}

impl ReconcileReport {
    fn merge(mut self, other: ReconcileReport) -> Self {
        self.skipped += other.skipped;
        self.created += other.created;
        self.started += other.started;
        self.removed += other.removed;
        self.failures.extend(other.failures);
        self
    }

    /// Whether the pass issued any mutating call
    pub fn changed(&self) -> bool {
        self.created + self.removed > 0
    }
}

/// Converges observed containers toward the desired state
pub struct Reconciler {
    config: SchedulerConfig,
    store: Arc<dyn DesiredStateStore>,
    backend: Arc<dyn ContainerBackend>,
    reconcile_tx: mpsc::Sender<()>,
}

impl Reconciler {
    /// Create a new reconciler and the receiver for its trigger channel
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn DesiredStateStore>,
        backend: Arc<dyn ContainerBackend>,
    ) -> (Arc<Self>, mpsc::Receiver<()>) {
        // One pending trigger is enough; a pass covers every workload
        let (reconcile_tx, reconcile_rx) = mpsc::channel(1);

        let reconciler = Arc::new(Self {
            config,
            store,
            backend,
            reconcile_tx,
        });

        (reconciler, reconcile_rx)
    }

    /// Request a pass without waiting for the next tick
    pub fn trigger_reconcile(&self) {
        let _ = self.reconcile_tx.try_send(());
    }

    /// Run passes until `shutdown` turns true or its sender is dropped
    pub async fn run(
        self: Arc<Self>,
        mut reconcile_rx: mpsc::Receiver<()>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let interval = Duration::from_secs(self.config.reconcile_interval_secs);
        let backoff = Duration::from_secs(self.config.retry_backoff_secs);

        tracing::info!(
            interval_secs = self.config.reconcile_interval_secs,
            policy = ?self.config.scale_down_policy,
            "Reconciler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.reconcile_once().await {
                Ok(report) => {
                    if report.changed() || !report.failures.is_empty() {
                        tracing::info!(
                            workloads = report.workloads,
                            created = report.created,
                            started = report.started,
                            removed = report.removed,
                            failures = report.failures.len(),
                            "Reconciliation pass finished"
                        );
                    } else {
                        tracing::debug!(workloads = report.workloads, "Fleet converged");
                    }
                    interval
                }
                Err(e) => {
                    tracing::error!(error = %e, retry_secs = backoff.as_secs(), "Reconciliation failed");
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                Some(_) = reconcile_rx.recv() => {
                    tracing::debug!("Triggered reconciliation");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Reconciler stopped");
    }

    /// Observed status of every workload whose listing succeeds
    pub async fn observe(&self) -> StoreResult<Vec<ObservedStatus>> {
        let snapshot = self.store.snapshot().await?;

        let statuses: Vec<ObservedStatus> = stream::iter(snapshot)
            .map(|state| async move { self.observe_workload(&state).await })
            .buffer_unordered(self.concurrency())
            .filter_map(|status| async move { status })
            .collect()
            .await;

        Ok(statuses)
    }

    /// Run a single pass over a fresh snapshot
    pub async fn reconcile_once(&self) -> StoreResult<ReconcileReport> {
        // Copied out before any backend call; no store lock is held below
        let snapshot = self.store.snapshot().await?;
        if snapshot.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let workloads = snapshot.len();
        let report = stream::iter(snapshot)
            .map(|state| async move { self.reconcile_workload(&state).await })
            .buffer_unordered(self.concurrency())
            .fold(ReconcileReport::default(), |acc, report| async move {
                acc.merge(report)
            })
            .await;

        Ok(ReconcileReport {
            workloads,
            ..report
        })
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrent_reconciliations.max(1)
    }

    async fn observe_workload(&self, state: &DesiredState) -> Option<ObservedStatus> {
        match self.backend.list_containers(state.selector()).await {
            Ok(containers) => Some(ObservedStatus::new(state, containers)),
            Err(e) => {
                tracing::warn!(
                    workload = %state.name(),
                    selector = %state.selector(),
                    error = %e,
                    "Failed to list containers"
                );
                None
            }
        }
    }

    async fn reconcile_workload(&self, state: &DesiredState) -> ReconcileReport {
        let Some(status) = self.observe_workload(state).await else {
            return ReconcileReport {
                skipped: 1,
                failures: vec![format!("{}: list failed", state.name())],
                ..Default::default()
            };
        };

        tracing::debug!(
            workload = %state.name(),
            desired = status.desired_count,
            current = status.current_count,
            "Reconciling workload"
        );

        match ScalePlan::for_status(&status, self.config.scale_down_policy) {
            ScalePlan::Steady => ReconcileReport::default(),
            ScalePlan::ScaleUp { count } => self.scale_up(state, count).await,
            ScalePlan::ScaleDown { remove } => self.scale_down(state, remove).await,
        }
    }

    async fn scale_up(&self, state: &DesiredState, count: usize) -> ReconcileReport {
        tracing::info!(workload = %state.name(), count, "Scaling up workload");

        let labels = state.selector().labels();
        let mut report = ReconcileReport::default();

        for _ in 0..count {
            let id = match self.backend.create_container(state.image(), &labels).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(workload = %state.name(), error = %e, "Failed to create container");
                    report.failures.push(format!("{}: create: {}", state.name(), e));
                    continue;
                }
            };
            report.created += 1;

            if let Err(e) = self.backend.start_container(&id).await {
                tracing::warn!(
                    workload = %state.name(),
                    container_id = %id,
                    error = %e,
                    "Failed to start container"
                );
                report.failures.push(format!("{}: start {}: {}", state.name(), id, e));

                // Stopped containers are never listed, so nothing else would clean it up
                if let Err(e) = self
                    .backend
                    .remove_container(&id, RemoveOptions::purge())
                    .await
                {
                    tracing::warn!(
                        workload = %state.name(),
                        container_id = %id,
                        error = %e,
                        "Failed to remove unstarted container"
                    );
                }
                continue;
            }
            report.started += 1;

            tracing::info!(workload = %state.name(), container_id = %id, "Created container");
        }

        report
    }

    async fn scale_down(&self, state: &DesiredState, remove: Vec<ContainerRef>) -> ReconcileReport {
        tracing::info!(workload = %state.name(), count = remove.len(), "Scaling down workload");

        let mut report = ReconcileReport::default();

        for container in remove {
            if let Err(e) = self
                .backend
                .remove_container(&container.id, RemoveOptions::purge())
                .await
            {
                tracing::warn!(
                    workload = %state.name(),
                    container_id = %container.id,
                    error = %e,
                    "Failed to remove container"
                );
                report
                    .failures
                    .push(format!("{}: remove {}: {}", state.name(), container.id, e));
                continue;
            }
            report.removed += 1;

            tracing::info!(workload = %state.name(), container_id = %container.id, "Deleted container");
        }

        report
    }
}
