//! Application state for API handlers

use crate::scheduler::Reconciler;
use crate::store::DesiredStateStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Desired-state store
    pub store: Arc<dyn DesiredStateStore>,

    /// Reconciler handle, used for status and to request early passes
    pub reconciler: Arc<Reconciler>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<dyn DesiredStateStore>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            store,
            reconciler,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        format_uptime((chrono::Utc::now() - self.started_at).num_seconds())
    }
}

fn format_uptime(secs: i64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
