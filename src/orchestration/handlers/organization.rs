use crate::constants::handlers;
use crate::dispatch::{CommandHandler, HandlerContext, HandlerError};
use crate::locks::EntityId;
use crate::models::command::{Command, CommandAction, CommandKind};
use crate::models::data::{Document, DocumentKind};
use crate::models::result::CommandResult;
use async_trait::async_trait;

/// Create/update/delete of organization documents. Deleting an organization
/// fans out destruction of every project it still contains.
pub struct OrganizationCommandHandler;

#[async_trait]
impl CommandHandler for OrganizationCommandHandler {
    fn handler_id(&self) -> &'static str {
        handlers::ORGANIZATION
    }

    fn handled_kinds(&self) -> Vec<CommandKind> {
        vec![
            CommandKind::new(DocumentKind::Organization, CommandAction::Create),
            CommandKind::new(DocumentKind::Organization, CommandAction::Update),
            CommandKind::new(DocumentKind::Organization, CommandAction::Delete),
        ]
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError> {
        let Document::Organization(organization) = &command.payload else {
            return Err(HandlerError::Unsupported(
                command.payload.kind().as_str().to_string(),
            ));
        };

        let mut result = command.create_result();
        let _lock = ctx
            .lock(&[EntityId::document(
                DocumentKind::Organization,
                &organization.id,
            )])
            .await;

        match command.action {
            CommandAction::Create | CommandAction::Update => {
                let stored = ctx.set_document(command.payload.clone()).await?;
                result.result = Some(serde_json::to_value(&stored)?);
            }
            CommandAction::Delete => {
                for child in ctx.list_documents(&organization.id).await? {
                    if matches!(child, Document::Project(_)) {
                        ctx.enqueue_command(Command::new(
                            CommandAction::Destroy,
                            child,
                            command.actor.clone(),
                        ))
                        .await?;
                    }
                }
                let removed = ctx.remove_document(&organization.id).await?;
                result.result = removed
                    .map(|document| serde_json::to_value(&document))
                    .transpose()?;
            }
            _ => return Err(HandlerError::Unsupported(command.type_name())),
        }

        Ok(result)
    }
}
