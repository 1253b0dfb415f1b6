//! Workflow-facing handle offering the suspension points of the runtime.
//!
//! Every operation either replays a journaled outcome (when the instance is
//! resuming) or executes live and journals the outcome before returning.
//! Workflow bodies must route all non-deterministic work through these calls.

use crate::locks::{EntityId, LockGuard};
use crate::runtime::engine::RuntimeShared;
use crate::runtime::journal::StepOutcome;
use crate::runtime::types::{ActivityError, RetryPolicy, WorkflowError, WorkflowFailure};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct WorkflowContext {
    instance_id: String,
    workflow_name: String,
    shared: Arc<RuntimeShared>,
    history: Vec<StepOutcome>,
    cursor: Mutex<usize>,
}

impl WorkflowContext {
    pub(crate) fn new(
        instance_id: String,
        workflow_name: String,
        shared: Arc<RuntimeShared>,
        history: Vec<StepOutcome>,
    ) -> Self {
        Self {
            instance_id,
            workflow_name,
            shared,
            history,
            cursor: Mutex::new(0),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    fn replay_next(&self) -> Option<(usize, StepOutcome)> {
        let mut cursor = self.cursor.lock();
        if *cursor < self.history.len() {
            let step = *cursor;
            *cursor += 1;
            Some((step, self.history[step].clone()))
        } else {
            None
        }
    }

    fn nondeterminism(&self, step: usize, recorded: &StepOutcome, requested: String) -> WorkflowError {
        WorkflowError::NonDeterministicReplay {
            step,
            recorded: recorded.label(),
            requested,
        }
    }

    async fn record(&self, outcome: StepOutcome) -> Result<(), WorkflowError> {
        self.shared
            .journal
            .append(&self.instance_id, outcome)
            .await
            .map_err(|e| WorkflowError::Journal(e.to_string()))
    }

    /// Call an activity with the runtime's default retry policy
    pub async fn call_activity(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowError> {
        let policy = self.shared.default_retry.clone();
        self.call_activity_with_retry(name, input, &policy).await
    }

    /// Call an activity, retrying transient failures with backoff inside the
    /// activity boundary. Exhaustion surfaces as a fatal workflow error.
    pub async fn call_activity_with_retry(
        &self,
        name: &str,
        input: serde_json::Value,
        policy: &RetryPolicy,
    ) -> Result<serde_json::Value, WorkflowError> {
        if let Some((step, recorded)) = self.replay_next() {
            return match recorded {
                StepOutcome::ActivityCompleted { name: n, output } if n == name => Ok(output),
                StepOutcome::ActivityFailed { name: n, message } if n == name => {
                    Err(WorkflowError::ActivityExhausted {
                        name: name.to_string(),
                        attempts: policy.max_attempts,
                        message,
                    })
                }
                other => Err(self.nondeterminism(step, &other, format!("activity '{name}'"))),
            };
        }

        let activity = self
            .shared
            .activities
            .get(name)
            .map(|entry| entry.value().clone());

        let Some(activity) = activity else {
            let error = WorkflowError::ActivityNotRegistered(name.to_string());
            self.record(StepOutcome::ActivityFailed {
                name: name.to_string(),
                message: error.to_string(),
            })
            .await?;
            return Err(error);
        };

        let mut attempt: u32 = 1;
        loop {
            match activity(input.clone()).await {
                Ok(output) => {
                    self.record(StepOutcome::ActivityCompleted {
                        name: name.to_string(),
                        output: output.clone(),
                    })
                    .await?;
                    return Ok(output);
                }
                Err(ActivityError::Transient(message)) if attempt < policy.max_attempts => {
                    warn!(
                        instance_id = %self.instance_id,
                        activity = %name,
                        attempt,
                        error = %message,
                        "transient activity failure, retrying"
                    );
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(error) => {
                    let message = error.to_string();
                    self.record(StepOutcome::ActivityFailed {
                        name: name.to_string(),
                        message: message.clone(),
                    })
                    .await?;
                    return Err(WorkflowError::ActivityExhausted {
                        name: name.to_string(),
                        attempts: attempt,
                        message,
                    });
                }
            }
        }
    }

    /// Durable timer; replay skips the sleep
    pub async fn create_timer(&self, duration: Duration) -> Result<(), WorkflowError> {
        if let Some((step, recorded)) = self.replay_next() {
            return match recorded {
                StepOutcome::TimerFired => Ok(()),
                other => Err(self.nondeterminism(step, &other, "timer".to_string())),
            };
        }

        tokio::time::sleep(duration).await;
        self.record(StepOutcome::TimerFired).await
    }

    /// Replay-stable wall clock read
    pub async fn current_utc(&self) -> Result<DateTime<Utc>, WorkflowError> {
        if let Some((step, recorded)) = self.replay_next() {
            return match recorded {
                StepOutcome::UtcRead { at } => Ok(at),
                other => Err(self.nondeterminism(step, &other, "utc read".to_string())),
            };
        }

        let at = Utc::now();
        self.record(StepOutcome::UtcRead { at }).await?;
        Ok(at)
    }

    /// Start a child instance and suspend until it finishes
    pub async fn call_sub_workflow(
        &self,
        name: &str,
        instance_id: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowError> {
        if let Some((step, recorded)) = self.replay_next() {
            return match recorded {
                StepOutcome::SubWorkflowCompleted { name: n, output } if n == name => Ok(output),
                StepOutcome::SubWorkflowFailed {
                    name: n,
                    message,
                    details,
                } if n == name => Err(WorkflowError::Failed(WorkflowFailure { message, details })),
                other => Err(self.nondeterminism(step, &other, format!("sub-workflow '{name}'"))),
            };
        }

        if let Err(error) = self.shared.start_instance(name, instance_id, input) {
            let failure = WorkflowFailure::new(error.to_string());
            self.record(StepOutcome::SubWorkflowFailed {
                name: name.to_string(),
                message: failure.message.clone(),
                details: None,
            })
            .await?;
            return Err(WorkflowError::Failed(failure));
        }

        match self.shared.wait_result(instance_id).await {
            Ok(output) => {
                self.record(StepOutcome::SubWorkflowCompleted {
                    name: name.to_string(),
                    output: output.clone(),
                })
                .await?;
                Ok(output)
            }
            Err(failure) => {
                self.record(StepOutcome::SubWorkflowFailed {
                    name: name.to_string(),
                    message: failure.message.clone(),
                    details: failure.details.clone(),
                })
                .await?;
                Err(WorkflowError::Failed(failure))
            }
        }
    }

    /// Suspend until an external event arrives or the timeout elapses
    pub async fn wait_for_external_event(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, WorkflowError> {
        if let Some((step, recorded)) = self.replay_next() {
            return match recorded {
                StepOutcome::EventReceived { name: n, payload } if n == name => Ok(payload),
                StepOutcome::EventTimedOut { name: n } if n == name => {
                    Err(WorkflowError::EventTimeout(name.to_string()))
                }
                other => {
                    Err(self.nondeterminism(step, &other, format!("external event '{name}'")))
                }
            };
        }

        match self.shared.wait_event(&self.instance_id, name, timeout).await {
            Some(payload) => {
                self.record(StepOutcome::EventReceived {
                    name: name.to_string(),
                    payload: payload.clone(),
                })
                .await?;
                Ok(payload)
            }
            None => {
                self.record(StepOutcome::EventTimedOut {
                    name: name.to_string(),
                })
                .await?;
                Err(WorkflowError::EventTimeout(name.to_string()))
            }
        }
    }

    /// Discard the journal and restart the body with fresh input. Use as
    /// `return Err(ctx.continue_as_new(input))`.
    pub fn continue_as_new(&self, input: serde_json::Value) -> WorkflowError {
        WorkflowError::ContinueAsNew(input)
    }

    /// Fire-and-forget spawn of an independent instance. Best effort:
    /// failures are logged, never propagated to the calling workflow.
    pub fn start_new_instance(&self, name: &str, instance_id: &str, input: serde_json::Value) {
        match self.shared.start_instance(name, instance_id, input) {
            Ok(started) => {
                debug!(
                    instance_id = %instance_id,
                    workflow = %name,
                    newly_started = started,
                    "spawned independent instance"
                );
            }
            Err(error) => {
                warn!(
                    instance_id = %instance_id,
                    workflow = %name,
                    error = %error,
                    "fire-and-forget instance start failed"
                );
            }
        }
    }

    /// Acquire the named entities, suspending until all are held. The guard
    /// releases on drop, on every exit path.
    pub async fn acquire_locks(&self, entities: &[EntityId]) -> LockGuard {
        self.shared.locks.acquire(&self.instance_id, entities).await
    }

    /// Is the entity currently locked by this instance?
    pub fn is_held_by(&self, entity: &EntityId) -> bool {
        self.shared.locks.is_held_by(&self.instance_id, entity)
    }
}
