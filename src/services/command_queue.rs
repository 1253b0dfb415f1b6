//! Command queue boundary: at-least-once delivery of JSON-serialized
//! envelopes. The payload's `type` discriminator makes polymorphic decoding
//! possible on the consumer side.

use crate::models::command::Command;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("command queue unavailable: {0}")]
    Unavailable(String),
    #[error("envelope decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait CommandQueue: Send + Sync {
    async fn enqueue(&self, command: &Command) -> Result<(), QueueError>;

    /// Next command, or `None` once the queue is closed and drained
    async fn dequeue(&self) -> Result<Option<Command>, QueueError>;
}

/// Channel-backed queue carrying serialized envelopes, used in tests and
/// embedded deployments
pub struct InMemoryCommandQueue {
    tx: mpsc::UnboundedSender<String>,
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl InMemoryCommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

impl Default for InMemoryCommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandQueue for InMemoryCommandQueue {
    async fn enqueue(&self, command: &Command) -> Result<(), QueueError> {
        let envelope = serde_json::to_string(command)?;
        self.tx
            .send(envelope)
            .map_err(|_| QueueError::Unavailable("queue closed".to_string()))
    }

    async fn dequeue(&self) -> Result<Option<Command>, QueueError> {
        let envelope = { self.rx.lock().await.recv().await };
        match envelope {
            Some(envelope) => Ok(Some(serde_json::from_str(&envelope)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::command::CommandAction;
    use crate::models::data::{Document, Organization, OrganizationRole, User};

    #[tokio::test]
    async fn envelope_survives_queue_round_trip() {
        let queue = InMemoryCommandQueue::new();
        let command = Command::new(
            CommandAction::Create,
            Document::Organization(Organization::new("acme", "Acme")),
            User::new("org-1", OrganizationRole::Owner),
        );

        queue.enqueue(&command).await.unwrap();
        let decoded = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(decoded, command);
    }
}
