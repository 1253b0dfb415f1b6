use crate::constants::defaults;
use crate::error::{Result, TeamforgeError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide policy configuration.
///
/// Every timing constant the orchestrations rely on lives here so that the
/// polling interval and the error-retention window stay operator-tunable
/// (and shrinkable in tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamforgeConfig {
    pub deployment_poll_interval_ms: u64,
    pub deployment_error_retention_secs: u64,
    pub activity_retry_attempts: u32,
    pub activity_backoff_base_ms: u64,
    pub activity_backoff_max_ms: u64,
    pub lock_lease_secs: u64,
    pub external_event_timeout_secs: u64,
}

impl Default for TeamforgeConfig {
    fn default() -> Self {
        Self {
            deployment_poll_interval_ms: defaults::DEPLOYMENT_POLL_INTERVAL_MS,
            deployment_error_retention_secs: defaults::DEPLOYMENT_ERROR_RETENTION_SECS,
            activity_retry_attempts: defaults::ACTIVITY_RETRY_ATTEMPTS,
            activity_backoff_base_ms: defaults::ACTIVITY_BACKOFF_BASE_MS,
            activity_backoff_max_ms: defaults::ACTIVITY_BACKOFF_MAX_MS,
            lock_lease_secs: defaults::LOCK_LEASE_SECS,
            external_event_timeout_secs: defaults::EXTERNAL_EVENT_TIMEOUT_SECS,
        }
    }
}

impl TeamforgeConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("TEAMFORGE_DEPLOYMENT_POLL_INTERVAL_MS") {
            config.deployment_poll_interval_ms = interval.parse().map_err(|e| {
                TeamforgeError::ConfigurationError(format!(
                    "Invalid deployment_poll_interval_ms: {e}"
                ))
            })?;
        }

        if let Ok(retention) = std::env::var("TEAMFORGE_DEPLOYMENT_ERROR_RETENTION_SECS") {
            config.deployment_error_retention_secs = retention.parse().map_err(|e| {
                TeamforgeError::ConfigurationError(format!(
                    "Invalid deployment_error_retention_secs: {e}"
                ))
            })?;
        }

        if let Ok(attempts) = std::env::var("TEAMFORGE_ACTIVITY_RETRY_ATTEMPTS") {
            config.activity_retry_attempts = attempts.parse().map_err(|e| {
                TeamforgeError::ConfigurationError(format!("Invalid activity_retry_attempts: {e}"))
            })?;
        }

        if let Ok(lease) = std::env::var("TEAMFORGE_LOCK_LEASE_SECS") {
            config.lock_lease_secs = lease.parse().map_err(|e| {
                TeamforgeError::ConfigurationError(format!("Invalid lock_lease_secs: {e}"))
            })?;
        }

        Ok(config)
    }

    pub fn deployment_poll_interval(&self) -> Duration {
        Duration::from_millis(self.deployment_poll_interval_ms)
    }

    pub fn deployment_error_retention(&self) -> Duration {
        Duration::from_secs(self.deployment_error_retention_secs)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_secs(self.lock_lease_secs)
    }

    pub fn external_event_timeout(&self) -> Duration {
        Duration::from_secs(self.external_event_timeout_secs)
    }
}
