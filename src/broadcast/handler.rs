use crate::constants::handlers;
use crate::dispatch::{CommandHandler, HandlerContext, HandlerError};
use crate::models::broadcast::{BroadcastItem, BroadcastMessage};
use crate::models::command::{Command, CommandAction, CommandKind};
use crate::models::data::{ChangeEvent, Document, DocumentKind};
use crate::models::result::CommandResult;
use crate::services::HubError;
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("unable to resolve a channel for payload of type '{0}'")]
    UnsupportedPayload(String),
    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Destination channels for a mutated document: project documents notify
/// their project channel, organization documents their own channel, and user
/// documents fan out to the user's organization plus every project the user
/// is a member of.
pub fn resolve_channels(document: &Document) -> Result<Vec<String>, BroadcastError> {
    let mut channels = match document {
        Document::User(user) => {
            let mut channels = vec![user.organization.clone()];
            channels.extend(
                user.project_memberships
                    .iter()
                    .map(|membership| membership.project_id.clone()),
            );
            channels
        }
        other => {
            if let Some(project) = other.project_context() {
                vec![project.to_string()]
            } else if let Some(organization) = other.organization_context() {
                vec![organization.to_string()]
            } else {
                return Err(BroadcastError::UnsupportedPayload(
                    other.kind().as_str().to_string(),
                ));
            }
        }
    };

    channels.sort();
    channels.dedup();
    Ok(channels)
}

/// Out-of-band handler publishing document mutations to pub/sub subscribers.
pub struct BroadcastCommandHandler;

impl BroadcastCommandHandler {
    fn broadcast_kinds() -> Vec<CommandKind> {
        let documents = [
            DocumentKind::Organization,
            DocumentKind::Project,
            DocumentKind::User,
            DocumentKind::Component,
        ];
        let changes = [ChangeEvent::Create, ChangeEvent::Update, ChangeEvent::Delete];

        documents
            .into_iter()
            .flat_map(|document| {
                changes
                    .into_iter()
                    .map(move |change| CommandKind::new(document, CommandAction::Broadcast(change)))
            })
            .collect()
    }
}

#[async_trait]
impl CommandHandler for BroadcastCommandHandler {
    fn handler_id(&self) -> &'static str {
        handlers::BROADCAST
    }

    fn handled_kinds(&self) -> Vec<CommandKind> {
        Self::broadcast_kinds()
    }

    fn orchestration(&self) -> bool {
        false
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext<'_>,
    ) -> Result<CommandResult, HandlerError> {
        let CommandAction::Broadcast(change) = command.action else {
            return Err(HandlerError::Unsupported(command.type_name()));
        };

        let mut result = command.create_result();

        let channels = resolve_channels(&command.payload).map_err(|error| match error {
            BroadcastError::UnsupportedPayload(payload_type) => {
                HandlerError::Unsupported(payload_type)
            }
            BroadcastError::Hub(hub_error) => HandlerError::Workflow(hub_error.to_string()),
        })?;

        let message = BroadcastMessage {
            action: change.as_str().to_string(),
            timestamp: Utc::now(),
            items: vec![BroadcastItem::from_document(&command.payload)],
        };
        let payload = serde_json::to_value(&message)?;

        for channel in &channels {
            ctx.services()
                .pubsub
                .send_to_all(channel, change.as_str(), payload.clone())
                .await
                .map_err(|error| HandlerError::Workflow(error.to_string()))?;

            debug!(
                channel = %channel,
                action = change.as_str(),
                document = command.payload.id(),
                "broadcast published"
            );
        }

        result.result = Some(payload);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::data::{Organization, OrganizationRole, Project, ProjectRole, User};

    #[test]
    fn organization_resolves_to_its_own_channel() {
        let mut org = Organization::new("acme", "Acme");
        org.id = "org-1".to_string();
        let channels = resolve_channels(&Document::Organization(org)).unwrap();
        assert_eq!(channels, vec!["org-1".to_string()]);
    }

    #[test]
    fn project_resolves_to_project_channel() {
        let mut project = Project::new("org-1", "alpha", "Alpha", serde_json::json!({}));
        project.id = "p1".to_string();
        let channels = resolve_channels(&Document::Project(project)).unwrap();
        assert_eq!(channels, vec!["p1".to_string()]);
    }

    #[test]
    fn user_fans_out_to_memberships_and_organization() {
        let mut user = User::new("org-1", OrganizationRole::Member);
        user.ensure_membership("p1", ProjectRole::Member);
        user.ensure_membership("p2", ProjectRole::Owner);

        let channels = resolve_channels(&Document::User(user)).unwrap();
        assert_eq!(
            channels,
            vec!["org-1".to_string(), "p1".to_string(), "p2".to_string()]
        );
    }
}
