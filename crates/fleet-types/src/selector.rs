//! Label selectors correlating workloads with backend containers
//!
//! A selector is derived once from the workload name when the workload is
//! submitted. Every reconciliation pass queries the backend with the same
//! selector; there is no container-ID bookkeeping between passes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label key stamped on every container the controller creates
pub const WORKLOAD_LABEL: &str = "com.swarm.app";

/// Equality selector on a single container label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Selector {
    key: String,
    value: String,
}

impl Selector {
    /// Derive the selector for a workload name
    pub fn for_workload(name: &str) -> Self {
        Self {
            key: WORKLOAD_LABEL.to_string(),
            value: name.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// `key=value` form, as used in Docker label filters
    pub fn label(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Label map applied to newly created containers
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(self.key.clone(), self.value.clone());
        labels
    }

    /// JSON-encoded `filters` argument for the Docker list endpoint
    pub fn filter(&self) -> String {
        serde_json::json!({ "label": [self.label()] }).to_string()
    }

    /// Whether a container's labels satisfy this selector
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key).is_some_and(|v| v == &self.value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
