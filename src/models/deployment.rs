//! # Deployment Descriptors
//!
//! The evolving input to the deployment polling workflow. The descriptor is
//! re-fed to the workflow on every continue-as-new, so it must carry the full
//! state needed to resume in any mode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal provisioning failure carrying the resource id and the collected
/// diagnostic messages. Raised by the polling workflow and always followed by
/// the unconditional delayed-cleanup path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("deployment '{resource_id}' failed: {errors:?}")]
pub struct ProvisioningError {
    pub resource_id: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    /// Name of the activity that starts the provisioning operation
    pub activity_name: String,
    pub activity_input: serde_json::Value,
    /// Absent until the provisioning call returns one
    pub resource_id: Option<String>,
    pub delete_requested: bool,
}

impl DeploymentDescriptor {
    pub fn new(activity_name: impl Into<String>, activity_input: serde_json::Value) -> Self {
        Self {
            activity_name: activity_name.into(),
            activity_input,
            resource_id: None,
            delete_requested: false,
        }
    }

    /// The delete-mode twin of this descriptor
    pub fn for_delete(&self) -> Self {
        let mut descriptor = self.clone();
        descriptor.delete_requested = true;
        descriptor
    }
}

/// State reported by the provisioning service for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl DeploymentState {
    pub fn is_progress_state(&self) -> bool {
        matches!(self, DeploymentState::Accepted | DeploymentState::Running)
    }

    pub fn is_error_state(&self) -> bool {
        matches!(self, DeploymentState::Failed | DeploymentState::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_and_error_predicates_are_disjoint() {
        for state in [
            DeploymentState::Accepted,
            DeploymentState::Running,
            DeploymentState::Succeeded,
            DeploymentState::Failed,
            DeploymentState::Canceled,
        ] {
            assert!(!(state.is_progress_state() && state.is_error_state()));
        }
        assert!(DeploymentState::Accepted.is_progress_state());
        assert!(DeploymentState::Canceled.is_error_state());
        assert!(!DeploymentState::Succeeded.is_progress_state());
        assert!(!DeploymentState::Succeeded.is_error_state());
    }

    #[test]
    fn delete_twin_keeps_resource_id() {
        let mut descriptor = DeploymentDescriptor::new(
            "deployment.create",
            serde_json::json!({"template": "standard"}),
        );
        descriptor.resource_id = Some("res-42".to_string());

        let delete = descriptor.for_delete();
        assert!(delete.delete_requested);
        assert_eq!(delete.resource_id.as_deref(), Some("res-42"));
    }
}
