use crate::models::audit::AuditRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuditStoreError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    #[error("audit serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence boundary for audit records. Writes for an existing key are
/// upserts; rows are never deleted.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn upsert(&self, record: AuditRecord) -> Result<(), AuditStoreError>;

    async fn get(&self, command_id: Uuid, handler_id: &str) -> Option<AuditRecord>;

    async fn list_for_command(&self, command_id: Uuid) -> Vec<AuditRecord>;
}

/// Map-backed store used in tests and embedded deployments
#[derive(Default)]
pub struct InMemoryAuditStore {
    records: DashMap<(Uuid, String), AuditRecord>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn upsert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        self.records.insert(record.key(), record);
        Ok(())
    }

    async fn get(&self, command_id: Uuid, handler_id: &str) -> Option<AuditRecord> {
        self.records
            .get(&(command_id, handler_id.to_string()))
            .map(|entry| entry.clone())
    }

    async fn list_for_command(&self, command_id: Uuid) -> Vec<AuditRecord> {
        self.records
            .iter()
            .filter(|entry| entry.key().0 == command_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}
