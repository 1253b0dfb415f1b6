//! # System Constants
//!
//! Core constants and well-known names that define the operational boundaries
//! of the TeamForge command orchestration engine.
//!
//! Workflow and activity names are fixed strings because they double as
//! durable instance identifiers and journal keys; renaming them invalidates
//! any persisted history.

/// Registered workflow (orchestration) names
pub mod workflows {
    /// Top-level command workflow: audit, dispatch, handle, audit, emit
    pub const COMMAND_ORCHESTRATION: &str = "command-orchestration";

    /// Self-continuing deployment polling workflow
    pub const DEPLOYMENT_ORCHESTRATION: &str = "deployment-orchestration";
}

/// Registered activity names
pub mod activities {
    // Audit
    pub const AUDIT_WRITE: &str = "audit.write";

    // Document store
    pub const DOCUMENT_GET: &str = "document.get";
    pub const DOCUMENT_SET: &str = "document.set";
    pub const DOCUMENT_REMOVE: &str = "document.remove";
    pub const DOCUMENT_LIST: &str = "document.list";

    // Command queue
    pub const COMMAND_ENQUEUE: &str = "command.enqueue";

    // Outbound notifications
    pub const NOTIFICATION_SEND: &str = "notification.send";

    // Provisioning service
    pub const DEPLOYMENT_CREATE: &str = "deployment.create";
    pub const DEPLOYMENT_STATE: &str = "deployment.state";
    pub const DEPLOYMENT_ERRORS: &str = "deployment.errors";
    pub const DEPLOYMENT_OUTPUTS: &str = "deployment.outputs";
    pub const DEPLOYMENT_DELETE: &str = "deployment.delete";
}

/// Handler identifiers used as the second half of audit record keys
pub mod handlers {
    /// The command orchestration itself audits under this id
    pub const ORCHESTRATOR: &str = "orchestrator";

    pub const ORGANIZATION: &str = "organization-handler";
    pub const PROJECT_CREATE: &str = "project-create-handler";
    pub const PROJECT_DEPLOY: &str = "project-deploy-handler";
    pub const PROJECT_DESTROY: &str = "project-destroy-handler";
    pub const USER: &str = "user-handler";
    pub const BROADCAST: &str = "broadcast-handler";
}

/// System-wide constants
pub mod system {
    /// Version compatibility marker
    pub const TEAMFORGE_CORE_VERSION: &str = "0.1.0";

    /// Entity type used for locks on external resource identifiers
    pub const RESOURCE_LOCK_TYPE: &str = "resource";

    /// Suffix appended to a deployment instance id for its delete-mode twin
    pub const DEPLOYMENT_DELETE_SUFFIX: &str = "-delete";

    /// Suffix appended to a command instance id for its deployment sub-workflow
    pub const DEPLOYMENT_SUB_SUFFIX: &str = "-deployment";
}

/// Default policy values; every one of these is overridable via
/// [`crate::config::TeamforgeConfig`]
pub mod defaults {
    /// Interval between deployment state polls
    pub const DEPLOYMENT_POLL_INTERVAL_MS: u64 = 10_000;

    /// Grace period before a failed deployment is torn down (7 days),
    /// kept so failed deployments remain inspectable
    pub const DEPLOYMENT_ERROR_RETENTION_SECS: u64 = 604_800;

    /// Activity retry attempts for transient failures
    pub const ACTIVITY_RETRY_ATTEMPTS: u32 = 3;

    /// Base backoff between activity retries
    pub const ACTIVITY_BACKOFF_BASE_MS: u64 = 100;

    /// Backoff ceiling between activity retries
    pub const ACTIVITY_BACKOFF_MAX_MS: u64 = 5_000;

    /// Lock lease duration before an orphaned holder may be reclaimed
    pub const LOCK_LEASE_SECS: u64 = 300;

    /// Default timeout for awaiting an external workflow event
    pub const EXTERNAL_EVENT_TIMEOUT_SECS: u64 = 300;
}
