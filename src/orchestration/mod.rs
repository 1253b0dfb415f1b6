//! # Command & Deployment Orchestrations
//!
//! The two workflow bodies at the heart of the engine: the top-level command
//! orchestration (audit, dispatch, handle, audit, emit) and the
//! self-continuing deployment polling orchestration with its unconditional
//! delayed cleanup. Both are registered against the durable runtime together
//! with the activities they call.

pub mod activities;
pub mod command;
pub mod deployment;
pub mod handlers;

pub use command::register_command_orchestration;
pub use deployment::register_deployment_orchestration;

use crate::audit::CommandAuditWriter;
use crate::config::TeamforgeConfig;
use crate::dispatch::CommandDispatcher;
use crate::locks::LockManager;
use crate::metrics::CommandMetricTracker;
use crate::services::ServiceCollection;
use std::sync::Arc;

/// Dependencies shared by the workflow bodies and their activities
pub struct OrchestrationDeps {
    pub dispatcher: CommandDispatcher,
    pub services: ServiceCollection,
    pub config: TeamforgeConfig,
    pub audit: CommandAuditWriter,
    pub metrics: CommandMetricTracker,
    pub locks: Arc<LockManager>,
}
