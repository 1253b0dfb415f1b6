//! # Broadcast Messages
//!
//! Out-of-band notifications describing document mutations, delivered to
//! pub/sub subscribers of the affected organization and project channels.

use crate::models::data::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Lowercase mutation name: `create`, `update` or `delete`
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<BroadcastItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub component: Option<String>,
    pub slug: Option<String>,
    pub etag: String,
    pub timestamp: DateTime<Utc>,
}

impl BroadcastItem {
    pub fn from_document(document: &Document) -> Self {
        Self {
            id: document.id().to_string(),
            item_type: document.kind().as_str().to_string(),
            organization: document.organization_context().map(str::to_string),
            project: document.project_context().map(str::to_string),
            component: document.component_context().map(str::to_string),
            slug: document.slug().map(str::to_string),
            etag: document.etag().to_string(),
            timestamp: document.timestamp(),
        }
    }
}
