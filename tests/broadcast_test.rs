//! Broadcast pipeline: channel resolution, membership fan-out and the full
//! change-feed to pub/sub path.

mod common;

use common::{actor, harness, organization, ScriptedProvisioning};
use std::time::Duration;
use teamforge_core::broadcast::ChangeNotifier;
use teamforge_core::models::broadcast::BroadcastMessage;
use teamforge_core::models::data::{ChangeEvent, Document, OrganizationRole, ProjectRole, User};
use teamforge_core::models::{Command, CommandAction, CommandRuntimeStatus};
use teamforge_core::processor::CommandProcessor;
use teamforge_core::services::{CommandQueue, DocumentStore};

#[tokio::test]
async fn organization_create_broadcasts_to_its_channel() {
    let h = harness(ScriptedProvisioning::new(None, vec![]));
    let mut subscriber = h.hub.subscribe("org-1");
    let processor = CommandProcessor::new(h.services, h.config).unwrap();

    let command = Command::new(
        CommandAction::Broadcast(ChangeEvent::Create),
        organization("org-1"),
        actor(),
    );
    let result = processor.process(command).await;
    assert_eq!(result.runtime_status, CommandRuntimeStatus::Completed);

    let event = tokio::time::timeout(Duration::from_secs(1), subscriber.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.channel, "org-1");
    assert_eq!(event.event, "create");

    let message: BroadcastMessage = serde_json::from_value(event.payload).unwrap();
    assert_eq!(message.action, "create");
    assert_eq!(message.items.len(), 1);
    assert_eq!(message.items[0].id, "org-1");
    assert_eq!(message.items[0].item_type, "organization");
}

#[tokio::test]
async fn user_delete_fans_out_to_project_and_organization_channels() {
    let h = harness(ScriptedProvisioning::new(None, vec![]));
    let mut org_rx = h.hub.subscribe("org-1");
    let mut p1_rx = h.hub.subscribe("p1");
    let mut p2_rx = h.hub.subscribe("p2");
    let processor = CommandProcessor::new(h.services, h.config).unwrap();

    let mut user = User::new("org-1", OrganizationRole::Member);
    user.ensure_membership("p1", ProjectRole::Member);
    user.ensure_membership("p2", ProjectRole::Member);

    let command = Command::new(
        CommandAction::Broadcast(ChangeEvent::Delete),
        Document::User(user),
        actor(),
    );
    let result = processor.process(command).await;
    assert_eq!(result.runtime_status, CommandRuntimeStatus::Completed);

    for rx in [&mut org_rx, &mut p1_rx, &mut p2_rx] {
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("channel missed the fan-out")
            .unwrap();
        assert_eq!(event.event, "delete");
        let message: BroadcastMessage = serde_json::from_value(event.payload).unwrap();
        assert_eq!(message.items[0].item_type, "user");
    }
}

#[tokio::test]
async fn document_mutation_flows_through_feed_queue_and_hub() {
    let h = harness(ScriptedProvisioning::new(None, vec![]));
    let mut subscriber = h.hub.subscribe("org-1");
    let processor = CommandProcessor::new(h.services.clone(), h.config).unwrap();

    let notifier = ChangeNotifier::new(h.queue.clone(), actor());
    notifier.attach(h.documents.as_ref());

    let consumer = {
        let processor = processor.clone();
        tokio::spawn(async move { processor.run_queue_consumer().await })
    };

    // Committing the mutation is what triggers the notification
    h.documents.set(organization("org-1")).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
        .await
        .expect("broadcast never reached the hub")
        .unwrap();
    assert_eq!(event.channel, "org-1");
    assert_eq!(event.event, "create");

    consumer.abort();
}

#[tokio::test]
async fn failed_broadcast_does_not_undo_the_mutation() {
    let h = harness(ScriptedProvisioning::new(None, vec![]));
    let processor = CommandProcessor::new(h.services.clone(), h.config).unwrap();

    let notifier = ChangeNotifier::new(h.queue.clone(), actor());
    notifier.attach(h.documents.as_ref());

    h.documents.set(organization("org-1")).await.unwrap();

    // Process the raised broadcast command; regardless of its outcome the
    // document stays committed
    if let Ok(Some(command)) = h.queue.dequeue().await {
        let _ = processor.process(command).await;
    }

    assert!(h.documents.get("org-1").await.unwrap().is_some());
}
