//! Pub/sub hub boundary for broadcast delivery.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("pub/sub hub unavailable: {0}")]
    Unavailable(String),
}

/// Connection details handed to a client joining a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGrant {
    pub channel: String,
    pub endpoint: String,
}

/// Event delivered to every subscriber of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait PubSubHub: Send + Sync {
    async fn negotiate(&self, channel: &str) -> Result<ChannelGrant, HubError>;

    async fn send_to_all(
        &self,
        channel: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HubError>;
}

/// Broadcast-channel hub used in tests and embedded deployments
#[derive(Default)]
pub struct InMemoryPubSubHub {
    channels: DashMap<String, broadcast::Sender<HubEvent>>,
}

impl InMemoryPubSubHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<HubEvent> {
        self.sender(channel).subscribe()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<HubEvent> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

#[async_trait]
impl PubSubHub for InMemoryPubSubHub {
    async fn negotiate(&self, channel: &str) -> Result<ChannelGrant, HubError> {
        Ok(ChannelGrant {
            channel: channel.to_string(),
            endpoint: format!("memory://{channel}"),
        })
    }

    async fn send_to_all(
        &self,
        channel: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HubError> {
        let hub_event = HubEvent {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
        };
        // A send with no subscribers is fine; broadcasts are best effort
        let _ = self.sender(channel).send(hub_event);
        Ok(())
    }
}
