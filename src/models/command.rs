//! # Command Envelope
//!
//! A command is a typed intent submitted for processing. Its `command_id` is
//! the idempotency key: the orchestration instance spawned for a command is
//! keyed by it, so re-delivery of the same envelope never creates a second
//! instance.

use crate::models::data::{ChangeEvent, Document, DocumentKind, User};
use crate::models::result::CommandResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What the command asks the system to do with its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Create,
    Update,
    Delete,
    Deploy,
    Destroy,
    /// Out-of-band change notification carrying the originating mutation
    Broadcast(ChangeEvent),
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandAction::Create => write!(f, "create"),
            CommandAction::Update => write!(f, "update"),
            CommandAction::Delete => write!(f, "delete"),
            CommandAction::Deploy => write!(f, "deploy"),
            CommandAction::Destroy => write!(f, "destroy"),
            CommandAction::Broadcast(change) => write!(f, "broadcast.{}", change.as_str()),
        }
    }
}

/// The concrete type of a command: payload kind plus action.
///
/// Handler registration maps these to handlers at construction time; there is
/// no runtime type inspection anywhere in dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandKind {
    pub document: DocumentKind,
    pub action: CommandAction,
}

impl CommandKind {
    pub fn new(document: DocumentKind, action: CommandAction) -> Self {
        Self { document, action }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.document.as_str(), self.action)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command_id: Uuid,
    /// Set when a handler enqueued this command as a follow-up
    pub parent_id: Option<Uuid>,
    pub action: CommandAction,
    pub payload: Document,
    pub actor: User,
}

impl Command {
    pub fn new(action: CommandAction, payload: Document, actor: User) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            parent_id: None,
            action,
            payload,
            actor,
        }
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::new(self.payload.kind(), self.action)
    }

    /// Stable name used in audit records and dispatch errors
    pub fn type_name(&self) -> String {
        self.kind().to_string()
    }

    /// Workflow instance id for this command
    pub fn instance_id(&self) -> String {
        self.command_id.to_string()
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.payload.organization_context()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.payload.project_context()
    }

    /// Produce the pending result this command's workflow will evolve
    pub fn create_result(&self) -> CommandResult {
        CommandResult::pending(self)
    }
}
