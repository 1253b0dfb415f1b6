//! Workflow runtime: instance registry, execution loop, status, termination.
//!
//! One instance per id; re-delivery of an id already started joins the
//! existing instance instead of creating a second one. The instance loop owns
//! continue-as-new: it resets the journal and re-enters the body with the new
//! input, so each run starts from a fresh history.

use crate::error::TeamforgeError;
use crate::locks::LockManager;
use crate::runtime::context::WorkflowContext;
use crate::runtime::journal::JournalStore;
use crate::runtime::types::{
    ActivityError, RetryPolicy, WorkflowError, WorkflowFailure, WorkflowStatus,
};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};

pub(crate) type WorkflowFn = Arc<
    dyn Fn(WorkflowContext, serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, WorkflowError>>
        + Send
        + Sync,
>;

pub(crate) type ActivityFn = Arc<
    dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, ActivityError>>
        + Send
        + Sync,
>;

/// Point-in-time view of a workflow instance
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

pub(crate) struct InstanceState {
    workflow_name: String,
    created: DateTime<Utc>,
    updated: Mutex<DateTime<Utc>>,
    status_tx: watch::Sender<WorkflowStatus>,
    status_rx: watch::Receiver<WorkflowStatus>,
    result: Mutex<Option<Result<serde_json::Value, WorkflowFailure>>>,
    join: Mutex<Option<tokio::task::JoinHandle<()>>>,
    events: Mutex<HashMap<String, VecDeque<serde_json::Value>>>,
    event_notify: Notify,
}

impl InstanceState {
    fn new(workflow_name: String) -> Self {
        let (status_tx, status_rx) = watch::channel(WorkflowStatus::Pending);
        Self {
            workflow_name,
            created: Utc::now(),
            updated: Mutex::new(Utc::now()),
            status_tx,
            status_rx,
            result: Mutex::new(None),
            join: Mutex::new(None),
            events: Mutex::new(HashMap::new()),
            event_notify: Notify::new(),
        }
    }

    fn status(&self) -> WorkflowStatus {
        *self.status_tx.borrow()
    }

    fn set_status(&self, status: WorkflowStatus) {
        if self.status().is_terminal() {
            return;
        }
        *self.updated.lock() = Utc::now();
        self.status_tx.send_replace(status);
    }

    fn finish(&self, outcome: Result<serde_json::Value, WorkflowFailure>) {
        let mut result = self.result.lock();
        if result.is_some() || self.status().is_terminal() {
            return;
        }
        let status = if outcome.is_ok() {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Failed
        };
        *result = Some(outcome);
        drop(result);
        *self.updated.lock() = Utc::now();
        self.status_tx.send_replace(status);
    }

    fn terminate(&self, reason: &str) {
        let mut result = self.result.lock();
        if result.is_some() || self.status().is_terminal() {
            return;
        }
        *result = Some(Err(WorkflowFailure::new(format!("terminated: {reason}"))));
        drop(result);
        *self.updated.lock() = Utc::now();
        self.status_tx.send_replace(WorkflowStatus::Terminated);
    }
}

pub(crate) struct RuntimeShared {
    pub(crate) workflows: DashMap<String, WorkflowFn>,
    pub(crate) activities: DashMap<String, ActivityFn>,
    pub(crate) instances: DashMap<String, Arc<InstanceState>>,
    pub(crate) journal: Arc<dyn JournalStore>,
    pub(crate) locks: Arc<LockManager>,
    pub(crate) default_retry: RetryPolicy,
}

impl RuntimeShared {
    /// Start an instance unless one with this id already exists.
    /// Returns whether a new instance was actually started.
    pub(crate) fn start_instance(
        self: &Arc<Self>,
        name: &str,
        instance_id: &str,
        input: serde_json::Value,
    ) -> Result<bool, TeamforgeError> {
        if !self.workflows.contains_key(name) {
            return Err(TeamforgeError::WorkflowError(format!(
                "workflow '{name}' is not registered"
            )));
        }

        match self.instances.entry(instance_id.to_string()) {
            Entry::Occupied(_) => {
                debug!(instance_id = %instance_id, "instance already exists, joining");
                Ok(false)
            }
            Entry::Vacant(vacant) => {
                let state = Arc::new(InstanceState::new(name.to_string()));
                vacant.insert(Arc::clone(&state));

                let shared = Arc::clone(self);
                let workflow_name = name.to_string();
                let id = instance_id.to_string();
                let task_state = Arc::clone(&state);
                let handle = tokio::spawn(async move {
                    run_instance(shared, workflow_name, id, input, task_state).await;
                });
                *state.join.lock() = Some(handle);

                Ok(true)
            }
        }
    }

    pub(crate) async fn wait_result(
        self: &Arc<Self>,
        instance_id: &str,
    ) -> Result<serde_json::Value, WorkflowFailure> {
        let Some(state) = self
            .instances
            .get(instance_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return Err(WorkflowFailure::new(format!(
                "unknown workflow instance '{instance_id}'"
            )));
        };

        let mut rx = state.status_rx.clone();
        let _ = rx.wait_for(|status| status.is_terminal()).await;

        state
            .result
            .lock()
            .clone()
            .unwrap_or_else(|| Err(WorkflowFailure::new("workflow finished without a result")))
    }

    pub(crate) async fn wait_event(
        self: &Arc<Self>,
        instance_id: &str,
        name: &str,
        timeout: Duration,
    ) -> Option<serde_json::Value> {
        let state = self
            .instances
            .get(instance_id)
            .map(|entry| Arc::clone(entry.value()))?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = state.event_notify.notified();
            let popped = {
                let mut events = state.events.lock();
                events.get_mut(name).and_then(|queue| queue.pop_front())
            };
            if let Some(payload) = popped {
                return Some(payload);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }
}

async fn run_instance(
    shared: Arc<RuntimeShared>,
    workflow_name: String,
    instance_id: String,
    mut input: serde_json::Value,
    state: Arc<InstanceState>,
) {
    let Some(body) = shared
        .workflows
        .get(&workflow_name)
        .map(|entry| entry.value().clone())
    else {
        state.finish(Err(WorkflowFailure::new(format!(
            "workflow '{workflow_name}' is not registered"
        ))));
        return;
    };

    loop {
        state.set_status(WorkflowStatus::Running);

        let history = match shared.journal.load(&instance_id).await {
            Ok(history) => history,
            Err(journal_error) => {
                error!(
                    instance_id = %instance_id,
                    error = %journal_error,
                    "journal load failed, failing instance"
                );
                state.finish(Err(WorkflowFailure::new(journal_error.to_string())));
                return;
            }
        };

        let ctx = WorkflowContext::new(
            instance_id.clone(),
            workflow_name.clone(),
            Arc::clone(&shared),
            history,
        );

        match body(ctx, input.clone()).await {
            Ok(output) => {
                info!(instance_id = %instance_id, workflow = %workflow_name, "workflow completed");
                state.finish(Ok(output));
                return;
            }
            Err(WorkflowError::ContinueAsNew(next_input)) => {
                if let Err(journal_error) = shared.journal.reset(&instance_id).await {
                    state.finish(Err(WorkflowFailure::new(journal_error.to_string())));
                    return;
                }
                state.set_status(WorkflowStatus::ContinuedAsNew);
                input = next_input;
            }
            Err(workflow_error) => {
                warn!(
                    instance_id = %instance_id,
                    workflow = %workflow_name,
                    error = %workflow_error,
                    "workflow failed"
                );
                state.finish(Err(workflow_error.into_failure()));
                return;
            }
        }
    }
}

/// Durable workflow runtime with named workflow and activity registries.
#[derive(Clone)]
pub struct WorkflowRuntime {
    shared: Arc<RuntimeShared>,
}

impl WorkflowRuntime {
    pub fn new(
        journal: Arc<dyn JournalStore>,
        locks: Arc<LockManager>,
        default_retry: RetryPolicy,
    ) -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                workflows: DashMap::new(),
                activities: DashMap::new(),
                instances: DashMap::new(),
                journal,
                locks,
                default_retry,
            }),
        }
    }

    pub fn register_workflow<F, Fut>(&self, name: &str, body: F)
    where
        F: Fn(WorkflowContext, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, WorkflowError>> + Send + 'static,
    {
        let workflow: WorkflowFn = Arc::new(move |ctx, input| Box::pin(body(ctx, input)));
        self.shared.workflows.insert(name.to_string(), workflow);
    }

    pub fn register_activity<F, Fut>(&self, name: &str, activity: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, ActivityError>> + Send + 'static,
    {
        let activity: ActivityFn = Arc::new(move |input| Box::pin(activity(input)));
        self.shared.activities.insert(name.to_string(), activity);
    }

    /// Start a new instance, or join the existing one with this id.
    /// Returns whether a new instance was started.
    pub fn start_new(
        &self,
        name: &str,
        instance_id: &str,
        input: serde_json::Value,
    ) -> Result<bool, TeamforgeError> {
        self.shared.start_instance(name, instance_id, input)
    }

    /// Suspend until the instance reaches a terminal status
    pub async fn wait_for_result(
        &self,
        instance_id: &str,
    ) -> Result<serde_json::Value, WorkflowFailure> {
        self.shared.wait_result(instance_id).await
    }

    pub fn get_status(&self, instance_id: &str) -> Option<InstanceInfo> {
        self.shared.instances.get(instance_id).map(|entry| {
            let state = entry.value();
            InstanceInfo {
                instance_id: instance_id.to_string(),
                workflow_name: state.workflow_name.clone(),
                status: state.status(),
                created: state.created,
                updated: *state.updated.lock(),
            }
        })
    }

    /// Abrupt termination: the workflow cursor stops, in-flight activities
    /// are not rolled back
    pub fn terminate(&self, instance_id: &str, reason: &str) -> bool {
        let Some(state) = self
            .shared
            .instances
            .get(instance_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return false;
        };

        if let Some(handle) = state.join.lock().take() {
            handle.abort();
        }
        state.terminate(reason);
        info!(instance_id = %instance_id, reason = %reason, "workflow terminated");
        true
    }

    /// Deliver an external event to a waiting instance
    pub fn raise_event(&self, instance_id: &str, name: &str, payload: serde_json::Value) -> bool {
        let Some(state) = self
            .shared
            .instances
            .get(instance_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return false;
        };

        state
            .events
            .lock()
            .entry(name.to_string())
            .or_default()
            .push_back(payload);
        state.event_notify.notify_waiters();
        true
    }

    pub fn locks(&self) -> Arc<LockManager> {
        Arc::clone(&self.shared.locks)
    }

    /// Count of instances currently tracked, terminal or not
    pub fn instance_count(&self) -> usize {
        self.shared.instances.len()
    }

    /// Instance ids currently registered for a given workflow name
    pub fn instances_of(&self, workflow_name: &str) -> Vec<String> {
        self.shared
            .instances
            .iter()
            .filter(|entry| entry.value().workflow_name == workflow_name)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::journal::InMemoryJournalStore;
    use serde_json::json;

    fn runtime() -> WorkflowRuntime {
        WorkflowRuntime::new(
            Arc::new(InMemoryJournalStore::new()),
            Arc::new(LockManager::new(Duration::from_secs(30))),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn completes_simple_workflow() {
        let rt = runtime();
        rt.register_activity("double", |input: serde_json::Value| async move {
            Ok(json!(input.as_i64().unwrap() * 2))
        });
        rt.register_workflow("doubler", |ctx: WorkflowContext, input| async move {
            ctx.call_activity("double", input).await
        });

        assert!(rt.start_new("doubler", "wf-1", json!(21)).unwrap());
        let output = rt.wait_for_result("wf-1").await.unwrap();
        assert_eq!(output, json!(42));
        assert_eq!(
            rt.get_status("wf-1").unwrap().status,
            WorkflowStatus::Completed
        );
    }

    #[tokio::test]
    async fn duplicate_start_joins_existing_instance() {
        let rt = runtime();
        rt.register_workflow("noop", |_ctx, _input| async move { Ok(json!("done")) });

        assert!(rt.start_new("noop", "wf-1", json!(null)).unwrap());
        assert!(!rt.start_new("noop", "wf-1", json!(null)).unwrap());
        assert_eq!(rt.instance_count(), 1);

        let output = rt.wait_for_result("wf-1").await.unwrap();
        assert_eq!(output, json!("done"));
    }

    #[tokio::test]
    async fn transient_activity_failures_are_retried() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let attempts = Arc::new(AtomicU32::new(0));
        let rt = runtime();

        let counter = Arc::clone(&attempts);
        rt.register_activity("flaky", move |_input| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ActivityError::Transient("throttled".to_string()))
                } else {
                    Ok(json!("ok"))
                }
            }
        });
        rt.register_workflow("retrying", |ctx: WorkflowContext, _input| async move {
            ctx.call_activity("flaky", json!(null)).await
        });

        rt.start_new("retrying", "wf-1", json!(null)).unwrap();
        let output = rt.wait_for_result("wf-1").await.unwrap();
        assert_eq!(output, json!("ok"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn continue_as_new_restarts_with_fresh_history() {
        let rt = runtime();
        rt.register_activity("probe", |input| async move { Ok(input) });
        rt.register_workflow("counting", |ctx: WorkflowContext, input| async move {
            let round = input.as_i64().unwrap_or(0);
            ctx.call_activity("probe", json!(round)).await?;
            if round < 3 {
                return Err(ctx.continue_as_new(json!(round + 1)));
            }
            Ok(json!(round))
        });

        rt.start_new("counting", "wf-1", json!(0)).unwrap();
        let output = rt.wait_for_result("wf-1").await.unwrap();
        assert_eq!(output, json!(3));
    }

    #[tokio::test]
    async fn terminate_stops_instance() {
        let rt = runtime();
        rt.register_workflow("eternal", |ctx: WorkflowContext, _input| async move {
            ctx.create_timer(Duration::from_secs(3600)).await?;
            Ok(json!(null))
        });

        rt.start_new("eternal", "wf-1", json!(null)).unwrap();
        tokio::task::yield_now().await;
        assert!(rt.terminate("wf-1", "provider configuration changed"));

        let failure = rt.wait_for_result("wf-1").await.unwrap_err();
        assert!(failure.message.contains("terminated"));
        assert_eq!(
            rt.get_status("wf-1").unwrap().status,
            WorkflowStatus::Terminated
        );
    }

    #[tokio::test]
    async fn unregistered_workflow_is_rejected() {
        let rt = runtime();
        assert!(rt.start_new("missing", "wf-1", json!(null)).is_err());
    }

    #[tokio::test]
    async fn restarted_instance_replays_committed_steps() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let journal: Arc<InMemoryJournalStore> = Arc::new(InMemoryJournalStore::new());
        let locks = Arc::new(LockManager::new(Duration::from_secs(30)));
        let executions = Arc::new(AtomicU32::new(0));

        let make_runtime = |journal: Arc<InMemoryJournalStore>, counter: Arc<AtomicU32>| {
            let rt = WorkflowRuntime::new(
                journal,
                Arc::clone(&locks),
                RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
            );
            rt.register_activity("provision", move |_input| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("res-1"))
                }
            });
            rt.register_workflow("provisioner", |ctx: WorkflowContext, _input| async move {
                let resource = ctx.call_activity("provision", json!(null)).await?;
                ctx.wait_for_external_event("go", Duration::from_secs(5))
                    .await?;
                Ok(resource)
            });
            rt
        };

        // First worker commits the activity outcome, then dies mid-wait
        let first = make_runtime(Arc::clone(&journal), Arc::clone(&executions));
        first.start_new("provisioner", "wf-1", json!(null)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        first.terminate("wf-1", "worker migration");

        // Second worker replays the journal: the activity is not re-executed
        let second = make_runtime(Arc::clone(&journal), Arc::clone(&executions));
        second.start_new("provisioner", "wf-1", json!(null)).unwrap();
        tokio::task::yield_now().await;
        second.raise_event("wf-1", "go", json!(null));

        let output = second.wait_for_result("wf-1").await.unwrap();
        assert_eq!(output, json!("res-1"));
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn external_event_is_delivered() {
        let rt = runtime();
        rt.register_workflow("waiting", |ctx: WorkflowContext, _input| async move {
            ctx.wait_for_external_event("approval", Duration::from_secs(5))
                .await
        });

        rt.start_new("waiting", "wf-1", json!(null)).unwrap();
        tokio::task::yield_now().await;
        assert!(rt.raise_event("wf-1", "approval", json!({"approved": true})));

        let output = rt.wait_for_result("wf-1").await.unwrap();
        assert_eq!(output["approved"], json!(true));
    }
}
