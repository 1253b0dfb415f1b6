//! # TeamForge Core
//!
//! Replay-safe command orchestration engine for cloud organization and
//! project provisioning.
//!
//! ## Overview
//!
//! TeamForge Core translates user intents (commands) into durable, retryable
//! workflows that call out to external provisioning services. Every command
//! is keyed by its id and runs as exactly one workflow instance; conflicting
//! mutations are serialized through distributed locks; long-running external
//! provisioning operations are driven by a self-continuing polling state
//! machine with guaranteed cleanup; and every command leaves an auditable,
//! idempotent result.
//!
//! ## Module Organization
//!
//! - [`models`] - Command envelopes, results, documents, deployment state
//! - [`runtime`] - Journaled, deterministically replayable workflow runtime
//! - [`locks`] - Named mutual exclusion with lease-based reclaim
//! - [`metrics`] - Fire-and-forget in-flight command counters
//! - [`audit`] - Best-effort, never-throwing command audit log
//! - [`dispatch`] - Compile-time command-to-handler registration table
//! - [`orchestration`] - Command and deployment polling workflow bodies
//! - [`broadcast`] - Change-feed to pub/sub notification pipeline
//! - [`services`] - Collaborator interfaces and in-memory implementations
//! - [`processor`] - Queue consumer tying the engine together
//! - [`config`] - Engine policy configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teamforge_core::config::TeamforgeConfig;
//! use teamforge_core::models::{Command, CommandAction, Document, Organization,
//!     OrganizationRole, User};
//! use teamforge_core::processor::CommandProcessor;
//! use teamforge_core::services::{InMemoryCommandQueue, InMemoryDocumentStore,
//!     InMemoryPubSubHub, ServiceCollection};
//!
//! # use teamforge_core::services::{ProvisioningService, ProvisioningServiceError};
//! # use teamforge_core::models::DeploymentState;
//! # struct NullProvisioning;
//! # #[async_trait::async_trait]
//! # impl ProvisioningService for NullProvisioning {
//! #     async fn deploy(&self, _t: serde_json::Value) -> Result<Option<String>, ProvisioningServiceError> { Ok(None) }
//! #     async fn get_state(&self, _r: &str) -> Result<DeploymentState, ProvisioningServiceError> { Ok(DeploymentState::Succeeded) }
//! #     async fn get_errors(&self, _r: &str) -> Result<Vec<String>, ProvisioningServiceError> { Ok(vec![]) }
//! #     async fn get_outputs(&self, _r: &str) -> Result<std::collections::HashMap<String, String>, ProvisioningServiceError> { Ok(Default::default()) }
//! #     async fn delete(&self, _r: &str) -> Result<(), ProvisioningServiceError> { Ok(()) }
//! # }
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let services = ServiceCollection {
//!     documents: Arc::new(InMemoryDocumentStore::new()),
//!     queue: Arc::new(InMemoryCommandQueue::new()),
//!     provisioning: Arc::new(NullProvisioning),
//!     pubsub: Arc::new(InMemoryPubSubHub::new()),
//!     notifications: None,
//! };
//!
//! let processor = CommandProcessor::new(services, TeamforgeConfig::default())?;
//!
//! let actor = User::new("org-1", OrganizationRole::Owner);
//! let command = Command::new(
//!     CommandAction::Create,
//!     Document::Organization(Organization::new("acme", "Acme")),
//!     actor,
//! );
//!
//! let result = processor.process(command).await;
//! println!("command finished with {:?}", result.runtime_status);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod broadcast;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod locks;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod processor;
pub mod runtime;
pub mod services;

pub use config::TeamforgeConfig;
pub use error::{Result, TeamforgeError};
pub use models::{
    Command, CommandAction, CommandKind, CommandResult, CommandRuntimeStatus, DeploymentDescriptor,
    DeploymentState, Document, DocumentKind, ProvisioningError,
};
pub use processor::CommandProcessor;
pub use runtime::{WorkflowRuntime, WorkflowStatus};
