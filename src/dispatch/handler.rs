//! Handler trait and the context handed to handlers.
//!
//! Orchestration handlers run inside the command workflow and route every
//! side effect through journaled activities; out-of-band handlers run inline
//! against the collaborator services directly. `HandlerContext` hides that
//! distinction behind one API.

use crate::config::TeamforgeConfig;
use crate::constants::{activities, system, workflows};
use crate::locks::{EntityId, LockGuard, LockManager};
use crate::models::command::{Command, CommandKind};
use crate::models::data::{Document, User};
use crate::models::deployment::{DeploymentDescriptor, ProvisioningError};
use crate::models::result::CommandResult;
use crate::runtime::{WorkflowContext, WorkflowError};
use crate::services::{
    NotificationMessage, QueueError, ServiceCollection, StoreError,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("document store failure: {0}")]
    Store(#[from] StoreError),
    #[error("command queue failure: {0}")]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Provisioning(ProvisioningError),
    #[error("workflow failure: {0}")]
    Workflow(String),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("operation requires an orchestration context")]
    RequiresOrchestration,
    #[error("document '{0}' not found")]
    NotFound(String),
    #[error("payload type '{0}' is not supported")]
    Unsupported(String),
}

impl HandlerError {
    /// Downgrade a workflow error, recovering a typed provisioning failure
    /// from the failure details when present
    pub fn from_workflow(error: WorkflowError) -> Self {
        match error {
            WorkflowError::Failed(failure) => {
                if let Some(details) = &failure.details {
                    if let Ok(provisioning) =
                        serde_json::from_value::<ProvisioningError>(details.clone())
                    {
                        return HandlerError::Provisioning(provisioning);
                    }
                }
                HandlerError::Workflow(failure.message)
            }
            other => HandlerError::Workflow(other.to_string()),
        }
    }
}

/// A registered command handler.
///
/// `orchestration() == true` marks a top-level handler whose work runs inside
/// a command workflow instance; out-of-band handlers (broadcast,
/// notifications) run synchronously inline without spawning one.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn handler_id(&self) -> &'static str;

    /// The command kinds this handler is statically registered for
    fn handled_kinds(&self) -> Vec<CommandKind>;

    fn orchestration(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError>;
}

/// Execution context for a handler invocation.
pub struct HandlerContext<'a> {
    command: &'a Command,
    workflow: Option<&'a WorkflowContext>,
    services: &'a ServiceCollection,
    config: &'a TeamforgeConfig,
    locks: Arc<LockManager>,
}

impl<'a> HandlerContext<'a> {
    pub fn for_workflow(
        command: &'a Command,
        workflow: &'a WorkflowContext,
        services: &'a ServiceCollection,
        config: &'a TeamforgeConfig,
        locks: Arc<LockManager>,
    ) -> Self {
        Self {
            command,
            workflow: Some(workflow),
            services,
            config,
            locks,
        }
    }

    pub fn out_of_band(
        command: &'a Command,
        services: &'a ServiceCollection,
        config: &'a TeamforgeConfig,
        locks: Arc<LockManager>,
    ) -> Self {
        Self {
            command,
            workflow: None,
            services,
            config,
            locks,
        }
    }

    pub fn command(&self) -> &Command {
        self.command
    }

    pub fn actor(&self) -> &User {
        &self.command.actor
    }

    pub fn config(&self) -> &TeamforgeConfig {
        self.config
    }

    pub fn services(&self) -> &ServiceCollection {
        self.services
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>, HandlerError> {
        match self.workflow {
            Some(ctx) => {
                let output = ctx
                    .call_activity(activities::DOCUMENT_GET, json!({ "id": id }))
                    .await
                    .map_err(HandlerError::from_workflow)?;
                Ok(serde_json::from_value(output)?)
            }
            None => Ok(self.services.documents.get(id).await?),
        }
    }

    pub async fn set_document(&self, document: Document) -> Result<Document, HandlerError> {
        match self.workflow {
            Some(ctx) => {
                let output = ctx
                    .call_activity(activities::DOCUMENT_SET, serde_json::to_value(&document)?)
                    .await
                    .map_err(HandlerError::from_workflow)?;
                Ok(serde_json::from_value(output)?)
            }
            None => Ok(self.services.documents.set(document).await?),
        }
    }

    pub async fn remove_document(&self, id: &str) -> Result<Option<Document>, HandlerError> {
        match self.workflow {
            Some(ctx) => {
                let output = ctx
                    .call_activity(activities::DOCUMENT_REMOVE, json!({ "id": id }))
                    .await
                    .map_err(HandlerError::from_workflow)?;
                Ok(serde_json::from_value(output)?)
            }
            None => Ok(self.services.documents.remove(id).await?),
        }
    }

    pub async fn list_documents(&self, parent_id: &str) -> Result<Vec<Document>, HandlerError> {
        match self.workflow {
            Some(ctx) => {
                let output = ctx
                    .call_activity(activities::DOCUMENT_LIST, json!({ "parent_id": parent_id }))
                    .await
                    .map_err(HandlerError::from_workflow)?;
                Ok(serde_json::from_value(output)?)
            }
            None => Ok(self.services.documents.list(parent_id).await?),
        }
    }

    /// Enqueue a follow-up command, tagging it with this command's id as its
    /// parent
    pub async fn enqueue_command(&self, mut command: Command) -> Result<(), HandlerError> {
        command.parent_id = Some(self.command.command_id);
        match self.workflow {
            Some(ctx) => {
                ctx.call_activity(activities::COMMAND_ENQUEUE, serde_json::to_value(&command)?)
                    .await
                    .map_err(HandlerError::from_workflow)?;
                Ok(())
            }
            None => Ok(self.services.queue.enqueue(&command).await?),
        }
    }

    /// Best-effort notification send. Returns a warning message when the
    /// optional sender is unconfigured or delivery fails; never an error.
    pub async fn send_notification(
        &self,
        message: NotificationMessage,
    ) -> Result<Option<String>, HandlerError> {
        match self.workflow {
            Some(ctx) => {
                let output = ctx
                    .call_activity(
                        activities::NOTIFICATION_SEND,
                        serde_json::to_value(&message)?,
                    )
                    .await
                    .map_err(HandlerError::from_workflow)?;
                Ok(serde_json::from_value(output)?)
            }
            None => Ok(send_notification_inline(self.services, message).await),
        }
    }

    /// Acquire locks on the named entities, suspending until all are held
    pub async fn lock(&self, entities: &[EntityId]) -> LockGuard {
        match self.workflow {
            Some(ctx) => ctx.acquire_locks(entities).await,
            None => {
                self.locks
                    .acquire(&self.command.instance_id(), entities)
                    .await
            }
        }
    }

    pub fn is_locked(&self, entity: &EntityId) -> bool {
        match self.workflow {
            Some(ctx) => ctx.is_held_by(entity),
            None => self.locks.is_held_by(&self.command.instance_id(), entity),
        }
    }

    /// Run a deployment to completion through the polling sub-workflow and
    /// return its output map. Empty when the operation was synchronous.
    pub async fn start_deployment(
        &self,
        descriptor: DeploymentDescriptor,
    ) -> Result<HashMap<String, String>, HandlerError> {
        let ctx = self.workflow.ok_or(HandlerError::RequiresOrchestration)?;
        let instance_id = format!("{}{}", ctx.instance_id(), system::DEPLOYMENT_SUB_SUFFIX);

        let output = ctx
            .call_sub_workflow(
                workflows::DEPLOYMENT_ORCHESTRATION,
                &instance_id,
                serde_json::to_value(&descriptor)?,
            )
            .await
            .map_err(HandlerError::from_workflow)?;

        if output.is_null() {
            Ok(HashMap::new())
        } else {
            Ok(serde_json::from_value(output)?)
        }
    }

    /// Fire-and-forget teardown of an existing resource through a delete-mode
    /// polling instance
    pub fn start_cleanup(&self, descriptor: &DeploymentDescriptor) -> Result<(), HandlerError> {
        let ctx = self.workflow.ok_or(HandlerError::RequiresOrchestration)?;
        let instance_id = format!(
            "{}{}",
            ctx.instance_id(),
            system::DEPLOYMENT_DELETE_SUFFIX
        );
        ctx.start_new_instance(
            workflows::DEPLOYMENT_ORCHESTRATION,
            &instance_id,
            serde_json::to_value(descriptor.for_delete())?,
        );
        Ok(())
    }
}

/// Shared inline implementation behind the notification activity and the
/// out-of-band context path
pub(crate) async fn send_notification_inline(
    services: &ServiceCollection,
    message: NotificationMessage,
) -> Option<String> {
    match &services.notifications {
        Some(sender) => match sender.send(message).await {
            Ok(()) => None,
            Err(error) => {
                warn!(error = %error, "notification delivery failed");
                Some(format!("notification delivery failed: {error}"))
            }
        },
        None => Some("no notification sender registered".to_string()),
    }
}
