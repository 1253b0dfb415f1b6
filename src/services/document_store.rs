//! Document store boundary with an optional change feed.
//!
//! Writes bump the document's etag and timestamp. Change-feed callbacks fire
//! after the mutation has committed; a failing subscriber can never undo the
//! write.

use crate::models::data::{ChangeEvent, Document};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

pub type ChangeCallback = Arc<dyn Fn(Document, ChangeEvent) + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("etag conflict for document '{0}'")]
    Conflict(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Upsert; returns the stored document with its fresh etag and timestamp
    async fn set(&self, document: Document) -> Result<Document, StoreError>;

    async fn remove(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Documents whose organization or project context is `parent_id`
    async fn list(&self, parent_id: &str) -> Result<Vec<Document>, StoreError>;

    /// Register a change-feed subscriber invoked as `(document, event)`
    fn subscribe_changes(&self, callback: ChangeCallback);
}

/// Map-backed store used in tests and embedded deployments
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<String, Document>,
    callbacks: RwLock<Vec<ChangeCallback>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, document: Document, event: ChangeEvent) {
        let callbacks = self.callbacks.read();
        for callback in callbacks.iter() {
            callback(document.clone(), event);
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.get(id).map(|entry| entry.clone()))
    }

    async fn set(&self, mut document: Document) -> Result<Document, StoreError> {
        document.bump();
        let event = if self.documents.contains_key(document.id()) {
            ChangeEvent::Update
        } else {
            ChangeEvent::Create
        };
        self.documents
            .insert(document.id().to_string(), document.clone());
        self.notify(document.clone(), event);
        Ok(document)
    }

    async fn remove(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let removed = self.documents.remove(id).map(|(_, document)| document);
        if let Some(document) = &removed {
            self.notify(document.clone(), ChangeEvent::Delete);
        }
        Ok(removed)
    }

    async fn list(&self, parent_id: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .documents
            .iter()
            .filter(|entry| {
                let document = entry.value();
                document.id() != parent_id
                    && (document.organization_context() == Some(parent_id)
                        || document.project_context() == Some(parent_id))
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn subscribe_changes(&self, callback: ChangeCallback) {
        self.callbacks.write().push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::data::{Organization, Project};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn set_bumps_etag_and_fires_change_feed() {
        let store = InMemoryDocumentStore::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        store.subscribe_changes(Arc::new(move |_doc, event| {
            assert_eq!(event, ChangeEvent::Create);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let org = Organization::new("acme", "Acme");
        let original_etag = org.etag.clone();
        let stored = store.set(Document::Organization(org)).await.unwrap();

        assert_ne!(stored.etag(), original_etag);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_returns_children_of_parent() {
        let store = InMemoryDocumentStore::new();
        let mut org = Organization::new("acme", "Acme");
        org.id = "org-1".to_string();
        store.set(Document::Organization(org)).await.unwrap();
        store
            .set(Document::Project(Project::new(
                "org-1",
                "alpha",
                "Alpha",
                serde_json::json!({}),
            )))
            .await
            .unwrap();

        let children = store.list("org-1").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind().as_str(), "project");
    }
}
