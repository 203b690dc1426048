//! Containers as reported by the orchestration backend

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Backend-assigned container identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, the form Docker prints
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A container matching some workload's selector
///
/// Field names follow the Docker Engine list response; fields the controller
/// does not use are dropped on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerRef {
    pub id: ContainerId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub names: Vec<String>,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub status: String,

    /// Creation time, unix seconds
    #[serde(default)]
    pub created: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

impl ContainerRef {
    pub fn new(id: impl Into<String>, image: impl Into<String>, created: i64) -> Self {
        Self {
            id: ContainerId::new(id),
            names: Vec::new(),
            image: image.into(),
            state: "running".to_string(),
            status: String::new(),
            created,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
