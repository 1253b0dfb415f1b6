//! Top-level command orchestration.
//!
//! State machine: `Start → AuditReceived → Dispatching → Handling →
//! AuditCompleted → Emit`. The audit and emit steps run no matter what
//! dispatch or handling did; a failed command still leaves a complete audit
//! trail and a terminal result.

use crate::constants::{activities, handlers, workflows};
use crate::dispatch::HandlerContext;
use crate::models::command::Command;
use crate::models::result::{CommandResult, CommandRuntimeStatus};
use crate::orchestration::activities::AuditWriteRequest;
use crate::orchestration::OrchestrationDeps;
use crate::runtime::{WorkflowContext, WorkflowError, WorkflowRuntime};
use std::sync::Arc;
use tracing::warn;

pub fn register_command_orchestration(runtime: &WorkflowRuntime, deps: Arc<OrchestrationDeps>) {
    runtime.register_workflow(workflows::COMMAND_ORCHESTRATION, move |ctx, input| {
        let deps = Arc::clone(&deps);
        async move { run_command_orchestration(ctx, input, deps).await }
    });
}

async fn run_command_orchestration(
    ctx: WorkflowContext,
    input: serde_json::Value,
    deps: Arc<OrchestrationDeps>,
) -> Result<serde_json::Value, WorkflowError> {
    let command: Command = serde_json::from_value(input)?;
    let mut result = command.create_result();

    // AuditReceived
    audit(&ctx, &command, &result).await?;

    // Dispatching
    match deps.dispatcher.dispatch(&command) {
        Err(dispatch_error) => {
            warn!(
                command_id = %command.command_id,
                error = %dispatch_error,
                "command dispatch failed"
            );
            result.push_error(dispatch_error.to_string());
        }
        Ok(handler) => {
            // Handling
            result.runtime_status = CommandRuntimeStatus::Running;
            result.sent = Some(ctx.current_utc().await?);

            let _in_flight = deps.metrics.track(command.kind());
            let handler_ctx = HandlerContext::for_workflow(
                &command,
                &ctx,
                &deps.services,
                &deps.config,
                Arc::clone(&deps.locks),
            );

            match handler.handle(&command, &handler_ctx).await {
                Ok(handled) => result = handled,
                Err(handler_error) => {
                    warn!(
                        command_id = %command.command_id,
                        handler = handler.handler_id(),
                        error = %handler_error,
                        "command handling failed"
                    );
                    result.push_error(handler_error.to_string());
                }
            }
        }
    }

    // AuditCompleted; runs on success and failure alike
    result.processed = Some(ctx.current_utc().await?);
    result.finalize();
    audit(&ctx, &command, &result).await?;

    // Emit
    Ok(serde_json::to_value(&result)?)
}

async fn audit(
    ctx: &WorkflowContext,
    command: &Command,
    result: &CommandResult,
) -> Result<(), WorkflowError> {
    let request = AuditWriteRequest {
        command: command.clone(),
        result: Some(result.clone()),
        handler_id: handlers::ORCHESTRATOR.to_string(),
    };
    ctx.call_activity(activities::AUDIT_WRITE, serde_json::to_value(&request)?)
        .await?;
    Ok(())
}
