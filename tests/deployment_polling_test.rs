//! Deployment polling orchestration: monitoring loop, error propagation and
//! the unconditional delete-mode cleanup with its retention window.

mod common;

use common::{harness, ScriptedProvisioning};
use std::sync::atomic::Ordering;
use std::time::Duration;
use teamforge_core::constants::{activities, workflows};
use teamforge_core::models::{DeploymentDescriptor, DeploymentState, ProvisioningError};
use teamforge_core::processor::CommandProcessor;

fn descriptor() -> serde_json::Value {
    serde_json::to_value(DeploymentDescriptor::new(
        activities::DEPLOYMENT_CREATE,
        serde_json::json!({"template": "standard"}),
    ))
    .unwrap()
}

async fn settle(check: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn successful_deployment_polls_to_completion_and_schedules_cleanup() {
    let provisioning = ScriptedProvisioning::new(
        Some("res-1"),
        vec![
            DeploymentState::Running,
            DeploymentState::Running,
            DeploymentState::Succeeded,
        ],
    );
    let h = harness(provisioning.clone());
    let processor = CommandProcessor::new(h.services, h.config).unwrap();
    let runtime = processor.runtime();

    runtime
        .start_new(workflows::DEPLOYMENT_ORCHESTRATION, "deploy-1", descriptor())
        .unwrap();

    let output = runtime.wait_for_result("deploy-1").await.unwrap();
    let outputs: std::collections::HashMap<String, String> =
        serde_json::from_value(output).unwrap();
    assert_eq!(outputs.get("resource_id").map(String::as_str), Some("res-1"));

    // Exactly one delete-mode twin is spawned and runs to completion
    assert!(
        settle(
            || provisioning.delete_calls.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5),
        )
        .await,
        "cleanup instance never deleted the resource"
    );

    // Three monitoring polls plus the delete-mode re-query
    assert_eq!(provisioning.deploy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provisioning.state_calls.load(Ordering::SeqCst), 4);
    assert_eq!(provisioning.outputs_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provisioning.errors_calls.load(Ordering::SeqCst), 0);

    let instances = runtime.instances_of(workflows::DEPLOYMENT_ORCHESTRATION);
    assert_eq!(instances.len(), 2);
    assert!(instances.contains(&"deploy-1-delete".to_string()));
}

#[tokio::test]
async fn failed_deployment_raises_provisioning_error_and_still_cleans_up() {
    let provisioning = ScriptedProvisioning::new(
        Some("res-1"),
        vec![DeploymentState::Running, DeploymentState::Failed],
    );
    let h = harness(provisioning.clone());
    let processor = CommandProcessor::new(h.services, h.config).unwrap();
    let runtime = processor.runtime();

    runtime
        .start_new(workflows::DEPLOYMENT_ORCHESTRATION, "deploy-1", descriptor())
        .unwrap();

    let failure = runtime.wait_for_result("deploy-1").await.unwrap_err();
    let provisioning_error: ProvisioningError =
        serde_json::from_value(failure.details.expect("typed provisioning details")).unwrap();
    assert_eq!(provisioning_error.resource_id, "res-1");
    assert_eq!(provisioning_error.errors, vec!["quota exceeded".to_string()]);
    assert_eq!(provisioning.errors_calls.load(Ordering::SeqCst), 1);

    // The delete-mode twin sees the error state and waits out the retention
    // window before deleting, so failed deployments stay inspectable
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(provisioning.delete_calls.load(Ordering::SeqCst), 0);

    assert!(
        settle(
            || provisioning.delete_calls.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5),
        )
        .await,
        "delete never ran after the retention window"
    );
    assert!(runtime
        .instances_of(workflows::DEPLOYMENT_ORCHESTRATION)
        .contains(&"deploy-1-delete".to_string()));
}

#[tokio::test]
async fn synchronous_deployment_completes_without_monitoring() {
    let provisioning = ScriptedProvisioning::new(None, vec![]);
    let h = harness(provisioning.clone());
    let processor = CommandProcessor::new(h.services, h.config).unwrap();
    let runtime = processor.runtime();

    runtime
        .start_new(workflows::DEPLOYMENT_ORCHESTRATION, "deploy-sync", descriptor())
        .unwrap();

    let output = runtime.wait_for_result("deploy-sync").await.unwrap();
    assert!(output.is_null());
    assert_eq!(provisioning.deploy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provisioning.state_calls.load(Ordering::SeqCst), 0);
    // Nothing was provisioned, so no cleanup twin is needed
    assert_eq!(
        runtime.instances_of(workflows::DEPLOYMENT_ORCHESTRATION).len(),
        1
    );
}
