//! # Command Results
//!
//! A `CommandResult` is created once per intent and is immutable except for
//! its runtime status and error accumulation. Errors are appended, never
//! overwritten; a single `Error`-severity entry forces the final status to
//! `Failed`, while `Warning` entries leave a `Completed` status intact.

use crate::models::command::Command;
use crate::runtime::WorkflowStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandRuntimeStatus {
    Unknown,
    Pending,
    Running,
    ContinuedAsNew,
    Completed,
    Failed,
    Canceled,
    Terminated,
}

impl CommandRuntimeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandRuntimeStatus::Completed
                | CommandRuntimeStatus::Failed
                | CommandRuntimeStatus::Canceled
                | CommandRuntimeStatus::Terminated
        )
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CommandRuntimeStatus::Unknown)
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CommandRuntimeStatus::Pending
                | CommandRuntimeStatus::Running
                | CommandRuntimeStatus::ContinuedAsNew
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    pub message: String,
    pub severity: ErrorSeverity,
}

impl CommandError {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: ErrorSeverity::Error,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: ErrorSeverity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: Uuid,
    pub command_type_name: String,
    pub runtime_status: CommandRuntimeStatus,
    pub result: Option<serde_json::Value>,
    pub errors: Vec<CommandError>,
    pub created: Option<DateTime<Utc>>,
    pub sent: Option<DateTime<Utc>>,
    pub processed: Option<DateTime<Utc>>,
    pub timeout: Option<DateTime<Utc>>,
    pub links: HashMap<String, String>,
}

impl CommandResult {
    pub fn pending(command: &Command) -> Self {
        Self {
            command_id: command.command_id,
            command_type_name: command.type_name(),
            runtime_status: CommandRuntimeStatus::Pending,
            result: None,
            errors: Vec::new(),
            created: Some(Utc::now()),
            sent: None,
            processed: None,
            timeout: None,
            links: HashMap::new(),
        }
    }

    /// Append an `Error`-severity entry
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(CommandError::error(message));
    }

    /// Append a `Warning`-severity entry
    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.errors.push(CommandError::warning(message));
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == ErrorSeverity::Error)
    }

    /// Map the workflow engine's status onto the result and copy timestamps
    pub fn apply_status(
        &mut self,
        status: WorkflowStatus,
        created: Option<DateTime<Utc>>,
        updated: Option<DateTime<Utc>>,
    ) {
        self.runtime_status = match status {
            WorkflowStatus::Unknown => CommandRuntimeStatus::Unknown,
            WorkflowStatus::Pending => CommandRuntimeStatus::Pending,
            WorkflowStatus::Running => CommandRuntimeStatus::Running,
            WorkflowStatus::ContinuedAsNew => CommandRuntimeStatus::ContinuedAsNew,
            WorkflowStatus::Completed => CommandRuntimeStatus::Completed,
            WorkflowStatus::Failed => CommandRuntimeStatus::Failed,
            WorkflowStatus::Canceled => CommandRuntimeStatus::Canceled,
            WorkflowStatus::Terminated => CommandRuntimeStatus::Terminated,
        };

        if self.created.is_none() {
            self.created = created;
        }

        if self.runtime_status.is_terminal() && self.processed.is_none() {
            self.processed = updated;
        }
    }

    /// Settle the final status from the accumulated errors: any fatal entry
    /// forces `Failed`, otherwise a non-terminal status becomes `Completed`.
    /// Externally imposed terminal states (canceled, terminated) stand.
    pub fn finalize(&mut self) {
        if matches!(
            self.runtime_status,
            CommandRuntimeStatus::Canceled | CommandRuntimeStatus::Terminated
        ) {
            return;
        }
        if self.has_fatal_errors() {
            self.runtime_status = CommandRuntimeStatus::Failed;
        } else if !self.runtime_status.is_terminal() {
            self.runtime_status = CommandRuntimeStatus::Completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::command::CommandAction;
    use crate::models::data::{Document, Organization, OrganizationRole, User};

    fn command() -> Command {
        Command::new(
            CommandAction::Create,
            Document::Organization(Organization::new("acme", "Acme")),
            User::new("org-1", OrganizationRole::Owner),
        )
    }

    #[test]
    fn fatal_error_forces_failed() {
        let mut result = command().create_result();
        result.push_warning("optional subsystem unavailable");
        result.push_error("boom");
        result.finalize();
        assert_eq!(result.runtime_status, CommandRuntimeStatus::Failed);
    }

    #[test]
    fn warnings_alone_complete() {
        let mut result = command().create_result();
        result.push_warning("no notification sender registered");
        result.finalize();
        assert_eq!(result.runtime_status, CommandRuntimeStatus::Completed);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn terminal_status_survives_finalize() {
        let mut result = command().create_result();
        result.runtime_status = CommandRuntimeStatus::Canceled;
        result.finalize();
        assert_eq!(result.runtime_status, CommandRuntimeStatus::Canceled);
    }

    #[test]
    fn result_round_trips_through_json() {
        let command = command();
        let mut result = command.create_result();
        result.result = Some(serde_json::json!({"endpoint": "https://example.test"}));
        result.push_warning("advisory");
        result.finalize();

        let json = serde_json::to_string(&result).unwrap();
        let decoded: CommandResult = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.command_id, result.command_id);
        assert_eq!(decoded.runtime_status, result.runtime_status);
        assert_eq!(decoded.result, result.result);
        assert_eq!(decoded.errors, result.errors);
    }
}
