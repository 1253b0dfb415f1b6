//! Provisioning service boundary.
//!
//! `deploy` may complete synchronously (no resource id) or return the id of a
//! long-running operation that the deployment polling workflow then monitors
//! to completion.

use crate::models::deployment::DeploymentState;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisioningServiceError {
    #[error("provisioning service failure: {0}")]
    Failure(String),
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
}

#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Start a deployment from a template. `None` means the operation
    /// completed synchronously and there is nothing to monitor.
    async fn deploy(
        &self,
        template: serde_json::Value,
    ) -> Result<Option<String>, ProvisioningServiceError>;

    async fn get_state(&self, resource_id: &str)
        -> Result<DeploymentState, ProvisioningServiceError>;

    async fn get_errors(&self, resource_id: &str) -> Result<Vec<String>, ProvisioningServiceError>;

    async fn get_outputs(
        &self,
        resource_id: &str,
    ) -> Result<HashMap<String, String>, ProvisioningServiceError>;

    async fn delete(&self, resource_id: &str) -> Result<(), ProvisioningServiceError>;
}
