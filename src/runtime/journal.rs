//! Step-outcome journal backing deterministic replay.
//!
//! Every suspension point appends its outcome before the workflow body
//! advances past it. A restarted instance loads the journal and replays
//! committed outcomes without re-executing the underlying work.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Committed outcome of a single suspension point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOutcome {
    ActivityCompleted {
        name: String,
        output: serde_json::Value,
    },
    ActivityFailed {
        name: String,
        message: String,
    },
    TimerFired,
    SubWorkflowCompleted {
        name: String,
        output: serde_json::Value,
    },
    SubWorkflowFailed {
        name: String,
        message: String,
        details: Option<serde_json::Value>,
    },
    EventReceived {
        name: String,
        payload: serde_json::Value,
    },
    EventTimedOut {
        name: String,
    },
    UtcRead {
        at: DateTime<Utc>,
    },
}

impl StepOutcome {
    /// Short label used in non-determinism diagnostics
    pub fn label(&self) -> String {
        match self {
            StepOutcome::ActivityCompleted { name, .. }
            | StepOutcome::ActivityFailed { name, .. } => format!("activity '{name}'"),
            StepOutcome::TimerFired => "timer".to_string(),
            StepOutcome::SubWorkflowCompleted { name, .. }
            | StepOutcome::SubWorkflowFailed { name, .. } => format!("sub-workflow '{name}'"),
            StepOutcome::EventReceived { name, .. } | StepOutcome::EventTimedOut { name } => {
                format!("external event '{name}'")
            }
            StepOutcome::UtcRead { .. } => "utc read".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for instance journals, keyed by instance id.
/// `reset` implements continue-as-new: the instance's history is discarded
/// and the next run starts from an empty journal.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn append(&self, instance_id: &str, outcome: StepOutcome) -> Result<(), JournalError>;

    async fn load(&self, instance_id: &str) -> Result<Vec<StepOutcome>, JournalError>;

    async fn reset(&self, instance_id: &str) -> Result<(), JournalError>;
}

/// Map-backed journal used in tests and embedded deployments
#[derive(Default)]
pub struct InMemoryJournalStore {
    entries: DashMap<String, Vec<StepOutcome>>,
}

impl InMemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JournalStore for InMemoryJournalStore {
    async fn append(&self, instance_id: &str, outcome: StepOutcome) -> Result<(), JournalError> {
        self.entries
            .entry(instance_id.to_string())
            .or_default()
            .push(outcome);
        Ok(())
    }

    async fn load(&self, instance_id: &str) -> Result<Vec<StepOutcome>, JournalError> {
        Ok(self
            .entries
            .get(instance_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn reset(&self, instance_id: &str) -> Result<(), JournalError> {
        self.entries.remove(instance_id);
        Ok(())
    }
}
