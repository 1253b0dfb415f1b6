//! Optional outbound notification boundary. Rendering and transport are
//! host concerns; an unregistered sender is reported as a warning, never a
//! failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub recipient_id: String,
    pub subject: String,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: NotificationMessage) -> Result<(), NotificationError>;
}
