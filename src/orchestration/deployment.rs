//! Deployment polling orchestration.
//!
//! A three-mode, self-continuing workflow over a [`DeploymentDescriptor`]:
//!
//! 1. **Start**: no resource id yet. Call the descriptor's provisioning
//!    activity; a returned resource id is persisted into the descriptor and
//!    the workflow re-enters from the top in monitoring mode. No resource id
//!    means the operation was synchronous and the workflow completes with no
//!    output.
//! 2. **Monitor**: poll the resource state on a durable timer. Progress
//!    states continue-as-new unchanged, so each poll starts a fresh history.
//!    Error states collect diagnostics and raise a provisioning failure;
//!    success collects the output map. Either way, a delete-mode twin of this
//!    workflow is started before the outcome surfaces, so every provisioning
//!    attempt is eventually torn down.
//! 3. **Delete**: re-query state; failed deployments wait out the retention
//!    window first so they remain inspectable, then the resource is deleted.

use crate::constants::{activities, system, workflows};
use crate::models::deployment::{DeploymentDescriptor, DeploymentState, ProvisioningError};
use crate::orchestration::OrchestrationDeps;
use crate::runtime::{WorkflowContext, WorkflowError, WorkflowFailure, WorkflowRuntime};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, warn};

pub fn register_deployment_orchestration(runtime: &WorkflowRuntime, deps: Arc<OrchestrationDeps>) {
    runtime.register_workflow(workflows::DEPLOYMENT_ORCHESTRATION, move |ctx, input| {
        let deps = Arc::clone(&deps);
        async move { run_deployment_orchestration(ctx, input, deps).await }
    });
}

async fn run_deployment_orchestration(
    ctx: WorkflowContext,
    input: Value,
    deps: Arc<OrchestrationDeps>,
) -> Result<Value, WorkflowError> {
    let descriptor: DeploymentDescriptor = serde_json::from_value(input)?;

    if descriptor.delete_requested {
        return run_delete_mode(&ctx, &descriptor, &deps).await;
    }

    match descriptor.resource_id.clone() {
        None => run_start_mode(&ctx, descriptor).await,
        Some(resource_id) => run_monitor_mode(&ctx, &descriptor, &resource_id, &deps).await,
    }
}

async fn run_start_mode(
    ctx: &WorkflowContext,
    descriptor: DeploymentDescriptor,
) -> Result<Value, WorkflowError> {
    let output = ctx
        .call_activity(&descriptor.activity_name, descriptor.activity_input.clone())
        .await?;
    let resource_id: Option<String> = serde_json::from_value(output)?;

    match resource_id {
        Some(resource_id) => {
            // Long-running operation: re-enter from the top in monitoring mode
            let mut next = descriptor;
            next.resource_id = Some(resource_id);
            Err(ctx.continue_as_new(serde_json::to_value(next)?))
        }
        // Synchronous operation, nothing to monitor
        None => Ok(Value::Null),
    }
}

async fn run_monitor_mode(
    ctx: &WorkflowContext,
    descriptor: &DeploymentDescriptor,
    resource_id: &str,
    deps: &Arc<OrchestrationDeps>,
) -> Result<Value, WorkflowError> {
    ctx.create_timer(deps.config.deployment_poll_interval())
        .await?;

    let state: DeploymentState = serde_json::from_value(
        ctx.call_activity(activities::DEPLOYMENT_STATE, json!(resource_id))
            .await?,
    )?;

    if state.is_progress_state() {
        // Unbounded polling loop, bounded only by the operation's own
        // completion; continue-as-new keeps the history flat
        return Err(ctx.continue_as_new(serde_json::to_value(descriptor)?));
    }

    let outcome: Result<Value, WorkflowError> = async {
        if state.is_error_state() {
            let errors: Vec<String> = serde_json::from_value(
                ctx.call_activity(activities::DEPLOYMENT_ERRORS, json!(resource_id))
                    .await?,
            )?;
            for message in &errors {
                warn!(resource_id = %resource_id, error = %message, "deployment reported error");
            }
            let provisioning = ProvisioningError {
                resource_id: resource_id.to_string(),
                errors,
            };
            Err(WorkflowError::Failed(WorkflowFailure::with_details(
                provisioning.to_string(),
                serde_json::to_value(&provisioning)?,
            )))
        } else {
            ctx.call_activity(activities::DEPLOYMENT_OUTPUTS, json!(resource_id))
                .await
        }
    }
    .await;

    // Guaranteed execution: the delete-mode twin starts whether the branch
    // above succeeded or failed, decoupling cleanup from the awaiting caller
    schedule_cleanup(ctx, descriptor);

    outcome
}

fn schedule_cleanup(ctx: &WorkflowContext, descriptor: &DeploymentDescriptor) {
    let instance_id = format!("{}{}", ctx.instance_id(), system::DEPLOYMENT_DELETE_SUFFIX);
    match serde_json::to_value(descriptor.for_delete()) {
        Ok(input) => {
            ctx.start_new_instance(workflows::DEPLOYMENT_ORCHESTRATION, &instance_id, input);
        }
        Err(serde_error) => {
            error!(
                instance_id = %instance_id,
                error = %serde_error,
                "failed to encode delete-mode descriptor, cleanup not scheduled"
            );
        }
    }
}

async fn run_delete_mode(
    ctx: &WorkflowContext,
    descriptor: &DeploymentDescriptor,
    deps: &Arc<OrchestrationDeps>,
) -> Result<Value, WorkflowError> {
    let Some(resource_id) = descriptor.resource_id.as_deref() else {
        // Nothing was provisioned, nothing to tear down
        return Ok(Value::Null);
    };

    let state: DeploymentState = serde_json::from_value(
        ctx.call_activity(activities::DEPLOYMENT_STATE, json!(resource_id))
            .await?,
    )?;

    if state.is_error_state() {
        // Failed deployments stay inspectable for the retention window
        ctx.create_timer(deps.config.deployment_error_retention())
            .await?;
    }

    ctx.call_activity(activities::DEPLOYMENT_DELETE, json!(resource_id))
        .await?;

    Ok(Value::Null)
}
