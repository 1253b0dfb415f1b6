use crate::constants::handlers;
use crate::dispatch::{CommandHandler, HandlerContext, HandlerError};
use crate::locks::EntityId;
use crate::models::command::{Command, CommandAction, CommandKind};
use crate::models::data::{Document, DocumentKind};
use crate::models::result::CommandResult;
use async_trait::async_trait;

/// Membership and profile mutations on user documents, serialized under the
/// user's document lock.
pub struct UserCommandHandler;

#[async_trait]
impl CommandHandler for UserCommandHandler {
    fn handler_id(&self) -> &'static str {
        handlers::USER
    }

    fn handled_kinds(&self) -> Vec<CommandKind> {
        vec![
            CommandKind::new(DocumentKind::User, CommandAction::Create),
            CommandKind::new(DocumentKind::User, CommandAction::Update),
            CommandKind::new(DocumentKind::User, CommandAction::Delete),
        ]
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError> {
        let Document::User(user) = &command.payload else {
            return Err(HandlerError::Unsupported(
                command.payload.kind().as_str().to_string(),
            ));
        };

        let mut result = command.create_result();
        let _lock = ctx
            .lock(&[EntityId::document(DocumentKind::User, &user.id)])
            .await;

        match command.action {
            CommandAction::Create | CommandAction::Update => {
                let stored = ctx.set_document(command.payload.clone()).await?;
                result.result = Some(serde_json::to_value(&stored)?);
            }
            CommandAction::Delete => {
                let removed = ctx.remove_document(&user.id).await?;
                result.result = removed
                    .map(|document| serde_json::to_value(&document))
                    .transpose()?;
            }
            _ => return Err(HandlerError::Unsupported(command.type_name())),
        }

        Ok(result)
    }
}
