use crate::constants::{activities, handlers};
use crate::dispatch::{CommandHandler, HandlerContext, HandlerError};
use crate::locks::EntityId;
use crate::models::command::{Command, CommandAction, CommandKind};
use crate::models::data::{Document, DocumentKind, ProjectRole};
use crate::models::deployment::DeploymentDescriptor;
use crate::models::result::CommandResult;
use crate::services::NotificationMessage;
use async_trait::async_trait;
use serde_json::json;

/// Persists a new project, grants the creating user an owner membership,
/// enqueues the deployment follow-up and sends the welcome notification.
pub struct ProjectCreateCommandHandler;

#[async_trait]
impl CommandHandler for ProjectCreateCommandHandler {
    fn handler_id(&self) -> &'static str {
        handlers::PROJECT_CREATE
    }

    fn handled_kinds(&self) -> Vec<CommandKind> {
        vec![
            CommandKind::new(DocumentKind::Project, CommandAction::Create),
            CommandKind::new(DocumentKind::Project, CommandAction::Update),
        ]
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError> {
        let Document::Project(project) = &command.payload else {
            return Err(HandlerError::Unsupported(
                command.payload.kind().as_str().to_string(),
            ));
        };

        let mut result = command.create_result();
        let _lock = ctx
            .lock(&[
                EntityId::document(DocumentKind::Project, &project.id),
                EntityId::document(DocumentKind::User, &command.actor.id),
            ])
            .await;

        let stored = ctx.set_document(command.payload.clone()).await?;

        if command.action == CommandAction::Create {
            // The creating user becomes the project owner
            let mut owner = match ctx.get_document(&command.actor.id).await? {
                Some(Document::User(user)) => user,
                _ => command.actor.clone(),
            };
            owner.ensure_membership(&project.id, ProjectRole::Owner);
            ctx.set_document(Document::User(owner)).await?;

            ctx.enqueue_command(Command::new(
                CommandAction::Deploy,
                stored.clone(),
                command.actor.clone(),
            ))
            .await?;

            if let Some(warning) = ctx
                .send_notification(NotificationMessage {
                    recipient_id: command.actor.id.clone(),
                    subject: format!("Welcome to {}", project.display_name),
                    body: json!({ "project": project.id, "organization": project.organization }),
                })
                .await?
            {
                result.push_warning(warning);
            }
        }

        result.result = Some(serde_json::to_value(&stored)?);
        Ok(result)
    }
}

/// Drives the project's provisioning template through the deployment polling
/// sub-workflow and stores the outputs back onto the project document.
pub struct ProjectDeployCommandHandler;

#[async_trait]
impl CommandHandler for ProjectDeployCommandHandler {
    fn handler_id(&self) -> &'static str {
        handlers::PROJECT_DEPLOY
    }

    fn handled_kinds(&self) -> Vec<CommandKind> {
        vec![CommandKind::new(DocumentKind::Project, CommandAction::Deploy)]
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError> {
        let Document::Project(project) = &command.payload else {
            return Err(HandlerError::Unsupported(
                command.payload.kind().as_str().to_string(),
            ));
        };

        let mut result = command.create_result();
        let _lock = ctx
            .lock(&[EntityId::document(DocumentKind::Project, &project.id)])
            .await;

        let current = match ctx.get_document(&project.id).await? {
            Some(Document::Project(current)) => current,
            _ => return Err(HandlerError::NotFound(project.id.clone())),
        };

        let descriptor = DeploymentDescriptor::new(
            activities::DEPLOYMENT_CREATE,
            json!({
                "organization": current.organization,
                "project": current.id,
                "template": current.template,
            }),
        );

        let outputs = ctx.start_deployment(descriptor).await?;

        let mut updated = current;
        if let Some(resource_id) = outputs.get("resource_id") {
            updated.resource_id = Some(resource_id.clone());
        }
        updated.deployment_outputs = outputs;

        let stored = ctx.set_document(Document::Project(updated)).await?;
        result.result = Some(serde_json::to_value(&stored)?);
        Ok(result)
    }
}

/// Removes a project and schedules teardown of its provisioned resource.
pub struct ProjectDestroyCommandHandler;

#[async_trait]
impl CommandHandler for ProjectDestroyCommandHandler {
    fn handler_id(&self) -> &'static str {
        handlers::PROJECT_DESTROY
    }

    fn handled_kinds(&self) -> Vec<CommandKind> {
        vec![
            CommandKind::new(DocumentKind::Project, CommandAction::Delete),
            CommandKind::new(DocumentKind::Project, CommandAction::Destroy),
        ]
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError> {
        let Document::Project(project) = &command.payload else {
            return Err(HandlerError::Unsupported(
                command.payload.kind().as_str().to_string(),
            ));
        };

        let mut result = command.create_result();
        let _lock = ctx
            .lock(&[EntityId::document(DocumentKind::Project, &project.id)])
            .await;

        let current = match ctx.get_document(&project.id).await? {
            Some(Document::Project(current)) => current,
            _ => {
                result.push_warning(format!("project '{}' no longer exists", project.id));
                return Ok(result);
            }
        };

        if let Some(resource_id) = &current.resource_id {
            let mut descriptor =
                DeploymentDescriptor::new(activities::DEPLOYMENT_CREATE, serde_json::Value::Null);
            descriptor.resource_id = Some(resource_id.clone());
            ctx.start_cleanup(&descriptor)?;
        }

        let removed = ctx.remove_document(&current.id).await?;
        result.result = removed
            .map(|document| serde_json::to_value(&document))
            .transpose()?;
        Ok(result)
    }
}
