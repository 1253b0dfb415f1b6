//! Activity registrations.
//!
//! Activities are the only place where the orchestrations touch the outside
//! world. Each one is a thin, idempotent shim over a collaborator service;
//! transient collaborator failures map to retryable activity errors, broken
//! inputs to permanent ones.

use crate::constants::activities;
use crate::dispatch::handler::send_notification_inline;
use crate::models::command::Command;
use crate::models::result::CommandResult;
use crate::orchestration::OrchestrationDeps;
use crate::runtime::{ActivityError, WorkflowRuntime};
use crate::services::{ProvisioningServiceError, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Input envelope for the audit-write activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditWriteRequest {
    pub command: Command,
    pub result: Option<CommandResult>,
    pub handler_id: String,
}

fn decode<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, ActivityError> {
    serde_json::from_value(input).map_err(|e| ActivityError::Permanent(e.to_string()))
}

fn encode<T: Serialize>(output: &T) -> Result<Value, ActivityError> {
    serde_json::to_value(output).map_err(|e| ActivityError::Permanent(e.to_string()))
}

fn store_error(error: StoreError) -> ActivityError {
    match error {
        StoreError::Unavailable(message) => ActivityError::Transient(message),
        StoreError::Conflict(document) => {
            ActivityError::Permanent(format!("etag conflict for document '{document}'"))
        }
    }
}

fn provisioning_error(error: ProvisioningServiceError) -> ActivityError {
    match error {
        ProvisioningServiceError::Failure(message) => ActivityError::Transient(message),
        ProvisioningServiceError::UnknownResource(resource) => {
            ActivityError::Permanent(format!("unknown resource '{resource}'"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ParentRequest {
    parent_id: String,
}

pub fn register_activities(runtime: &WorkflowRuntime, deps: Arc<OrchestrationDeps>) {
    let audit_deps = Arc::clone(&deps);
    runtime.register_activity(activities::AUDIT_WRITE, move |input| {
        let deps = Arc::clone(&audit_deps);
        async move {
            let request: AuditWriteRequest = decode(input)?;
            // Never fails; audit is observability, not correctness
            deps.audit
                .write(&request.command, request.result.as_ref(), &request.handler_id)
                .await;
            Ok(Value::Null)
        }
    });

    let get_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DOCUMENT_GET, move |input| {
        let deps = Arc::clone(&get_deps);
        async move {
            let request: IdRequest = decode(input)?;
            let document = deps
                .services
                .documents
                .get(&request.id)
                .await
                .map_err(store_error)?;
            encode(&document)
        }
    });

    let set_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DOCUMENT_SET, move |input| {
        let deps = Arc::clone(&set_deps);
        async move {
            let document = decode(input)?;
            let stored = deps
                .services
                .documents
                .set(document)
                .await
                .map_err(store_error)?;
            encode(&stored)
        }
    });

    let remove_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DOCUMENT_REMOVE, move |input| {
        let deps = Arc::clone(&remove_deps);
        async move {
            let request: IdRequest = decode(input)?;
            let removed = deps
                .services
                .documents
                .remove(&request.id)
                .await
                .map_err(store_error)?;
            encode(&removed)
        }
    });

    let list_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DOCUMENT_LIST, move |input| {
        let deps = Arc::clone(&list_deps);
        async move {
            let request: ParentRequest = decode(input)?;
            let documents = deps
                .services
                .documents
                .list(&request.parent_id)
                .await
                .map_err(store_error)?;
            encode(&documents)
        }
    });

    let enqueue_deps = Arc::clone(&deps);
    runtime.register_activity(activities::COMMAND_ENQUEUE, move |input| {
        let deps = Arc::clone(&enqueue_deps);
        async move {
            let command: Command = decode(input)?;
            deps.services
                .queue
                .enqueue(&command)
                .await
                .map_err(|e| ActivityError::Transient(e.to_string()))?;
            Ok(Value::Null)
        }
    });

    let notify_deps = Arc::clone(&deps);
    runtime.register_activity(activities::NOTIFICATION_SEND, move |input| {
        let deps = Arc::clone(&notify_deps);
        async move {
            let message = decode(input)?;
            let warning = send_notification_inline(&deps.services, message).await;
            encode(&warning)
        }
    });

    let create_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DEPLOYMENT_CREATE, move |input| {
        let deps = Arc::clone(&create_deps);
        async move {
            let resource_id = deps
                .services
                .provisioning
                .deploy(input)
                .await
                .map_err(provisioning_error)?;
            encode(&resource_id)
        }
    });

    let state_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DEPLOYMENT_STATE, move |input| {
        let deps = Arc::clone(&state_deps);
        async move {
            let resource_id: String = decode(input)?;
            let state = deps
                .services
                .provisioning
                .get_state(&resource_id)
                .await
                .map_err(provisioning_error)?;
            encode(&state)
        }
    });

    let errors_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DEPLOYMENT_ERRORS, move |input| {
        let deps = Arc::clone(&errors_deps);
        async move {
            let resource_id: String = decode(input)?;
            let errors = deps
                .services
                .provisioning
                .get_errors(&resource_id)
                .await
                .map_err(provisioning_error)?;
            encode(&errors)
        }
    });

    let outputs_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DEPLOYMENT_OUTPUTS, move |input| {
        let deps = Arc::clone(&outputs_deps);
        async move {
            let resource_id: String = decode(input)?;
            let outputs = deps
                .services
                .provisioning
                .get_outputs(&resource_id)
                .await
                .map_err(provisioning_error)?;
            encode(&outputs)
        }
    });

    let delete_deps = Arc::clone(&deps);
    runtime.register_activity(activities::DEPLOYMENT_DELETE, move |input| {
        let deps = Arc::clone(&delete_deps);
        async move {
            let resource_id: String = decode(input)?;
            deps.services
                .provisioning
                .delete(&resource_id)
                .await
                .map_err(provisioning_error)?;
            Ok(Value::Null)
        }
    });
}
