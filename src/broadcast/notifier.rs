use crate::models::command::{Command, CommandAction};
use crate::models::data::{ChangeEvent, Document, User};
use crate::services::{CommandQueue, DocumentStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bridges the document store's change feed onto the command queue.
///
/// Enqueueing is fire-and-forget: the mutation has already committed, so a
/// failed enqueue is logged and dropped.
pub struct ChangeNotifier {
    queue: Arc<dyn CommandQueue>,
    system_actor: User,
}

impl ChangeNotifier {
    pub fn new(queue: Arc<dyn CommandQueue>, system_actor: User) -> Arc<Self> {
        Arc::new(Self {
            queue,
            system_actor,
        })
    }

    /// Register this notifier as a change-feed subscriber of the store
    pub fn attach(self: &Arc<Self>, store: &dyn DocumentStore) {
        let notifier = Arc::clone(self);
        store.subscribe_changes(Arc::new(move |document, event| {
            notifier.publish(document, event);
        }));
    }

    fn publish(&self, document: Document, event: ChangeEvent) {
        let command = Command::new(
            CommandAction::Broadcast(event),
            document,
            self.system_actor.clone(),
        );

        debug!(
            command_id = %command.command_id,
            kind = %command.kind(),
            "broadcast command raised from change feed"
        );

        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            if let Err(error) = queue.enqueue(&command).await {
                warn!(
                    command_id = %command.command_id,
                    error = %error,
                    "broadcast enqueue failed, notification dropped"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::data::{Organization, OrganizationRole};
    use crate::services::{InMemoryCommandQueue, InMemoryDocumentStore};
    use std::time::Duration;

    #[tokio::test]
    async fn store_writes_surface_as_broadcast_commands() {
        let store = InMemoryDocumentStore::new();
        let queue: Arc<InMemoryCommandQueue> = Arc::new(InMemoryCommandQueue::new());
        let notifier = ChangeNotifier::new(
            queue.clone(),
            User::new("org-1", OrganizationRole::Admin),
        );
        notifier.attach(&store);

        store
            .set(Document::Organization(Organization::new("acme", "Acme")))
            .await
            .unwrap();

        let command = tokio::time::timeout(Duration::from_secs(1), queue.dequeue())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(
            command.action,
            CommandAction::Broadcast(ChangeEvent::Create)
        );
        assert_eq!(command.payload.kind().as_str(), "organization");
    }
}
