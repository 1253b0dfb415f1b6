use crate::config::TeamforgeConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle status of a workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Unknown,
    Pending,
    Running,
    ContinuedAsNew,
    Completed,
    Failed,
    Canceled,
    Terminated,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed
                | WorkflowStatus::Failed
                | WorkflowStatus::Canceled
                | WorkflowStatus::Terminated
        )
    }
}

/// Retry policy applied inside the activity boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_max,
        }
    }

    pub fn from_config(config: &TeamforgeConfig) -> Self {
        Self::new(
            config.activity_retry_attempts,
            Duration::from_millis(config.activity_backoff_base_ms),
            Duration::from_millis(config.activity_backoff_max_ms),
        )
    }

    /// Exponential backoff, capped at `backoff_max`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// Error raised by an activity implementation. Transient failures are
/// retried by the runtime; permanent failures surface immediately.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("{0}")]
    Permanent(String),
}

/// Serializable failure snapshot of a finished workflow instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFailure {
    pub message: String,
    /// Structured diagnostic payload, e.g. a provisioning error body
    pub details: Option<serde_json::Value>,
}

impl WorkflowFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            message: message.into(),
            details: Some(details),
        }
    }
}

impl fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("activity '{name}' exhausted {attempts} attempts: {message}")]
    ActivityExhausted {
        name: String,
        attempts: u32,
        message: String,
    },
    #[error("activity '{0}' is not registered")]
    ActivityNotRegistered(String),
    #[error("workflow '{0}' is not registered")]
    WorkflowNotRegistered(String),
    #[error("external event '{0}' timed out")]
    EventTimeout(String),
    #[error("non-deterministic replay at step {step}: journal holds {recorded}, body requested {requested}")]
    NonDeterministicReplay {
        step: usize,
        recorded: String,
        requested: String,
    },
    #[error("journal failure: {0}")]
    Journal(String),
    #[error("serialization failure: {0}")]
    Serialization(String),
    #[error("{0}")]
    Failed(WorkflowFailure),
    /// Control flow marker, consumed by the instance loop and never surfaced
    /// as a failure
    #[error("workflow continuing as new")]
    ContinueAsNew(serde_json::Value),
}

impl WorkflowError {
    /// Collapse into the serializable failure stored on the instance
    pub fn into_failure(self) -> WorkflowFailure {
        match self {
            WorkflowError::Failed(failure) => failure,
            other => WorkflowFailure::new(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(error: serde_json::Error) -> Self {
        WorkflowError::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(10), Duration::from_millis(350));
    }

    #[test]
    fn failure_keeps_details() {
        let error = WorkflowError::Failed(WorkflowFailure::with_details(
            "deployment failed",
            serde_json::json!({"resource_id": "res-1"}),
        ));
        let failure = error.into_failure();
        assert_eq!(failure.details.unwrap()["resource_id"], "res-1");
    }
}
