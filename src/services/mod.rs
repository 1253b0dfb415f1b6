//! # Collaborator Interfaces
//!
//! The engine's external collaborators, specified at their interface
//! boundary: document storage, the command queue, the provisioning service,
//! the pub/sub hub and the optional notification sender. In-memory
//! implementations back tests and embedded deployments; production hosts
//! bring their own.

pub mod command_queue;
pub mod document_store;
pub mod notification;
pub mod provisioning;
pub mod pubsub;

pub use command_queue::{CommandQueue, InMemoryCommandQueue, QueueError};
pub use document_store::{ChangeCallback, DocumentStore, InMemoryDocumentStore, StoreError};
pub use notification::{NotificationError, NotificationMessage, NotificationSender};
pub use provisioning::{ProvisioningService, ProvisioningServiceError};
pub use pubsub::{ChannelGrant, HubError, HubEvent, InMemoryPubSubHub, PubSubHub};

use std::sync::Arc;

/// Bundle of collaborator handles threaded through handlers and activities
#[derive(Clone)]
pub struct ServiceCollection {
    pub documents: Arc<dyn DocumentStore>,
    pub queue: Arc<dyn CommandQueue>,
    pub provisioning: Arc<dyn ProvisioningService>,
    pub pubsub: Arc<dyn PubSubHub>,
    /// Optional subsystem; absence downgrades notification sends to warnings
    pub notifications: Option<Arc<dyn NotificationSender>>,
}
