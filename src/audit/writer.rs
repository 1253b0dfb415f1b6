use crate::audit::store::AuditStore;
use crate::models::audit::AuditRecord;
use crate::models::command::Command;
use crate::models::result::CommandResult;
use std::sync::Arc;
use tracing::warn;

/// Writes audit records for command lifecycle transitions.
///
/// `write` is idempotent per `(command_id, handler_id)` and never returns an
/// error: persistence failures are logged and dropped. Called at minimum
/// twice per command (received, completed); handlers may also audit interim
/// milestones under their own handler id.
#[derive(Clone)]
pub struct CommandAuditWriter {
    store: Arc<dyn AuditStore>,
}

impl CommandAuditWriter {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn write(
        &self,
        command: &Command,
        result: Option<&CommandResult>,
        handler_id: &str,
    ) {
        let mut record = match self.store.get(command.command_id, handler_id).await {
            Some(existing) => existing,
            None => AuditRecord::new(command, handler_id),
        };

        match result {
            Some(result) => record.merge_result(result),
            None => {
                let snapshot = command.create_result();
                record.merge_result(&snapshot);
            }
        }

        if let Err(error) = self.store.upsert(record).await {
            warn!(
                command_id = %command.command_id,
                handler_id = %handler_id,
                error = %error,
                "audit write failed, continuing"
            );
        }
    }
}
