//! Workload submissions and the desired state derived from them

use crate::{Selector, ValidationError};
use serde::{Deserialize, Serialize};

/// A workload as submitted by an operator
///
/// Wire form is `{"Count": 3, "Image": "nginx:1.27", "Name": "web"}`. Missing
/// fields decode to their zero values; a negative `Count` does not decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkloadSpec {
    /// Unique workload name
    #[serde(default, alias = "name")]
    pub name: String,

    /// Container image reference
    #[serde(default, alias = "image")]
    pub image: String,

    /// Desired number of running containers
    #[serde(default, rename = "Count", alias = "count")]
    pub replicas: u32,
}

impl WorkloadSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, replicas: u32) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            replicas,
        }
    }

    /// Full validation, used by the submit endpoint before it reaches the store
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.image.trim().is_empty() {
            return Err(ValidationError::EmptyImage(self.name.clone()));
        }
        Ok(())
    }
}

/// Desired state of one workload
///
/// Only constructible from a [`WorkloadSpec`], so the selector always matches
/// the name it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DesiredState {
    name: String,
    image: String,
    #[serde(rename = "Count")]
    replicas: u32,
    selector: Selector,
}

impl DesiredState {
    /// Build the desired state for a spec, deriving its selector
    pub fn from_spec(spec: WorkloadSpec) -> Result<Self, ValidationError> {
        if spec.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let selector = Selector::for_workload(&spec.name);
        Ok(Self {
            name: spec.name,
            image: spec.image,
            replicas: spec.replicas,
            selector,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The spec this state was built from
    pub fn spec(&self) -> WorkloadSpec {
        WorkloadSpec::new(self.name.clone(), self.image.clone(), self.replicas)
    }
}

impl TryFrom<WorkloadSpec> for DesiredState {
    type Error = ValidationError;

    fn try_from(spec: WorkloadSpec) -> Result<Self, Self::Error> {
        Self::from_spec(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_decodes_wire_form() {
        let spec: WorkloadSpec =
            serde_json::from_str(r#"{"Count": 3, "Image": "nginx:1.27", "Name": "web"}"#).unwrap();
        assert_eq!(spec, WorkloadSpec::new("web", "nginx:1.27", 3));
    }

    #[test]
    fn test_spec_missing_fields_default_to_zero_values() {
        let spec: WorkloadSpec = serde_json::from_str(r#"{"Name": "web"}"#).unwrap();
        assert_eq!(spec.image, "");
        assert_eq!(spec.replicas, 0);
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let result = serde_json::from_str::<WorkloadSpec>(
            r#"{"Count": -1, "Image": "nginx", "Name": "web"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(WorkloadSpec::new("web", "nginx", 1).validate().is_ok());
        assert_eq!(
            WorkloadSpec::new(" ", "nginx", 1).validate(),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            WorkloadSpec::new("web", "", 1).validate(),
            Err(ValidationError::EmptyImage("web".to_string()))
        );
    }

    #[test]
    fn test_desired_state_derives_selector() {
        let state = DesiredState::from_spec(WorkloadSpec::new("web", "nginx", 2)).unwrap();
        assert_eq!(state.name(), "web");
        assert_eq!(state.replicas(), 2);
        assert_eq!(state.selector(), &Selector::for_workload("web"));
        assert_eq!(state.spec(), WorkloadSpec::new("web", "nginx", 2));
    }

    #[test]
    fn test_desired_state_requires_name() {
        let result = DesiredState::try_from(WorkloadSpec::new("", "nginx", 1));
        assert_eq!(result, Err(ValidationError::EmptyName));
    }
}
