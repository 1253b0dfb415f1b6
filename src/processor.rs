//! # Command Processor
//!
//! Queue-consumer glue tying the engine together: out-of-band command kinds
//! run inline, everything else starts (or joins) the command orchestration
//! instance keyed by the command's id and awaits its result. Duplicate
//! delivery of a command id therefore yields the existing instance's result
//! instead of a second execution.

use crate::audit::{AuditStore, CommandAuditWriter, InMemoryAuditStore};
use crate::broadcast::BroadcastCommandHandler;
use crate::config::TeamforgeConfig;
use crate::constants::workflows;
use crate::dispatch::{CommandDispatcher, CommandHandler, HandlerContext};
use crate::error::{Result, TeamforgeError};
use crate::locks::LockManager;
use crate::metrics::CommandMetricTracker;
use crate::models::command::Command;
use crate::models::result::CommandResult;
use crate::orchestration::handlers::{
    OrganizationCommandHandler, ProjectCreateCommandHandler, ProjectDeployCommandHandler,
    ProjectDestroyCommandHandler, UserCommandHandler,
};
use crate::orchestration::{
    activities::register_activities, register_command_orchestration,
    register_deployment_orchestration, OrchestrationDeps,
};
use crate::runtime::{InMemoryJournalStore, JournalStore, RetryPolicy, WorkflowRuntime};
use crate::services::ServiceCollection;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CommandProcessor {
    runtime: WorkflowRuntime,
    deps: Arc<OrchestrationDeps>,
}

impl CommandProcessor {
    /// Build a processor with in-memory journal and audit stores
    pub fn new(services: ServiceCollection, config: TeamforgeConfig) -> Result<Self> {
        Self::with_stores(
            services,
            config,
            Arc::new(InMemoryJournalStore::new()),
            Arc::new(InMemoryAuditStore::new()),
        )
    }

    pub fn with_stores(
        services: ServiceCollection,
        config: TeamforgeConfig,
        journal: Arc<dyn JournalStore>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Result<Self> {
        let locks = Arc::new(LockManager::new(config.lock_lease()));

        let mut dispatcher = CommandDispatcher::new();
        let handlers: Vec<Arc<dyn CommandHandler>> = vec![
            Arc::new(OrganizationCommandHandler),
            Arc::new(ProjectCreateCommandHandler),
            Arc::new(ProjectDeployCommandHandler),
            Arc::new(ProjectDestroyCommandHandler),
            Arc::new(UserCommandHandler),
            Arc::new(BroadcastCommandHandler),
        ];
        for handler in handlers {
            dispatcher
                .register(handler)
                .map_err(|e| TeamforgeError::DispatchError(e.to_string()))?;
        }

        let deps = Arc::new(OrchestrationDeps {
            dispatcher,
            services,
            config: config.clone(),
            audit: CommandAuditWriter::new(audit_store),
            metrics: CommandMetricTracker::new(),
            locks: Arc::clone(&locks),
        });

        let runtime = WorkflowRuntime::new(journal, locks, RetryPolicy::from_config(&config));
        register_activities(&runtime, Arc::clone(&deps));
        register_command_orchestration(&runtime, Arc::clone(&deps));
        register_deployment_orchestration(&runtime, Arc::clone(&deps));

        Ok(Self { runtime, deps })
    }

    pub fn runtime(&self) -> &WorkflowRuntime {
        &self.runtime
    }

    pub fn metrics(&self) -> &CommandMetricTracker {
        &self.deps.metrics
    }

    /// Process one command to its final result
    pub async fn process(&self, command: Command) -> CommandResult {
        match self.deps.dispatcher.resolve(command.kind()) {
            Some(handler) if !handler.orchestration() => {
                self.process_inline(handler, command).await
            }
            // Orchestration handlers and unmapped kinds both go through the
            // command workflow; dispatch failures surface in its result
            _ => self.process_orchestrated(command).await,
        }
    }

    async fn process_inline(
        &self,
        handler: Arc<dyn CommandHandler>,
        command: Command,
    ) -> CommandResult {
        self.deps
            .audit
            .write(&command, None, handler.handler_id())
            .await;

        let _in_flight = self.deps.metrics.track(command.kind());
        let ctx = HandlerContext::out_of_band(
            &command,
            &self.deps.services,
            &self.deps.config,
            Arc::clone(&self.deps.locks),
        );

        let mut result = match handler.handle(&command, &ctx).await {
            Ok(result) => result,
            Err(error) => {
                let mut failed = command.create_result();
                failed.push_error(error.to_string());
                failed
            }
        };

        result.processed = Some(Utc::now());
        result.finalize();

        self.deps
            .audit
            .write(&command, Some(&result), handler.handler_id())
            .await;
        result
    }

    async fn process_orchestrated(&self, command: Command) -> CommandResult {
        let instance_id = command.instance_id();

        let input = match serde_json::to_value(&command) {
            Ok(input) => input,
            Err(serde_error) => {
                let mut result = command.create_result();
                result.push_error(format!("command encode failed: {serde_error}"));
                result.finalize();
                return result;
            }
        };

        if let Err(start_error) =
            self.runtime
                .start_new(workflows::COMMAND_ORCHESTRATION, &instance_id, input)
        {
            let mut result = command.create_result();
            result.push_error(start_error.to_string());
            result.finalize();
            return result;
        }

        match self.runtime.wait_for_result(&instance_id).await {
            Ok(output) => serde_json::from_value(output).unwrap_or_else(|decode_error| {
                let mut result = command.create_result();
                result.push_error(format!("result decode failed: {decode_error}"));
                result.finalize();
                result
            }),
            Err(failure) => {
                let mut result = command.create_result();
                if let Some(info) = self.runtime.get_status(&instance_id) {
                    result.apply_status(info.status, Some(info.created), Some(info.updated));
                }
                result.push_error(failure.message);
                result.finalize();
                result
            }
        }
    }

    /// Drain the command queue until it closes, processing each command on
    /// its own task so independent instances progress concurrently
    pub async fn run_queue_consumer(&self) -> Result<()> {
        loop {
            let command = self
                .deps
                .services
                .queue
                .dequeue()
                .await
                .map_err(|e| TeamforgeError::CommandError(e.to_string()))?;

            let Some(command) = command else {
                return Ok(());
            };

            let processor = self.clone();
            tokio::spawn(async move {
                let result = processor.process(command).await;
                debug!(
                    command_id = %result.command_id,
                    status = ?result.runtime_status,
                    "queued command processed"
                );
            });
        }
    }
}
