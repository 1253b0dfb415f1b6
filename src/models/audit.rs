//! # Audit Records
//!
//! Append-only status log entries keyed by `(command_id, handler_id)`.
//! Repeated writes for the same key are upserts; records are never deleted.

use crate::models::command::Command;
use crate::models::result::{CommandError, CommandResult, CommandRuntimeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub command_id: Uuid,
    pub handler_id: String,
    pub command_type_name: String,
    pub project_id: Option<String>,
    pub status: CommandRuntimeStatus,
    pub created: Option<DateTime<Utc>>,
    pub sent: Option<DateTime<Utc>>,
    pub processed: Option<DateTime<Utc>>,
    pub timeout: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub errors: Vec<CommandError>,
}

impl AuditRecord {
    pub fn new(command: &Command, handler_id: impl Into<String>) -> Self {
        Self {
            command_id: command.command_id,
            handler_id: handler_id.into(),
            command_type_name: command.type_name(),
            project_id: command.project_id().map(str::to_string),
            status: CommandRuntimeStatus::Unknown,
            created: None,
            sent: None,
            processed: None,
            timeout: None,
            updated: None,
            errors: Vec::new(),
        }
    }

    pub fn key(&self) -> (Uuid, String) {
        (self.command_id, self.handler_id.clone())
    }

    /// Merge a result snapshot into this record, keeping the earliest
    /// `created` and the latest `updated` timestamp seen across writes
    pub fn merge_result(&mut self, result: &CommandResult) {
        let now = Utc::now();

        self.status = result.runtime_status;
        self.errors = result.errors.clone();
        self.sent = result.sent.or(self.sent);
        self.processed = result.processed.or(self.processed);
        self.timeout = result.timeout.or(self.timeout);

        self.created = match (self.created, result.created) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b).or(Some(now)),
        };
        self.updated = match self.updated {
            Some(existing) => Some(existing.max(now)),
            None => Some(now),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::command::CommandAction;
    use crate::models::data::{Document, Organization, OrganizationRole, User};

    #[test]
    fn merge_keeps_earliest_created() {
        let command = Command::new(
            CommandAction::Create,
            Document::Organization(Organization::new("acme", "Acme")),
            User::new("org-1", OrganizationRole::Owner),
        );
        let mut record = AuditRecord::new(&command, "orchestrator");

        let mut first = command.create_result();
        first.created = Some(Utc::now() - chrono::Duration::seconds(60));
        record.merge_result(&first);
        let earliest = record.created;

        let mut second = command.create_result();
        second.created = Some(Utc::now());
        second.runtime_status = CommandRuntimeStatus::Completed;
        record.merge_result(&second);

        assert_eq!(record.created, earliest);
        assert_eq!(record.status, CommandRuntimeStatus::Completed);
        assert!(record.updated.is_some());
    }
}
