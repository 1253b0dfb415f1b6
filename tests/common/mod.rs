//! Shared fixtures for integration tests.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use teamforge_core::config::TeamforgeConfig;
use teamforge_core::models::data::{Document, Organization, OrganizationRole, User};
use teamforge_core::models::DeploymentState;
use teamforge_core::services::{
    InMemoryCommandQueue, InMemoryDocumentStore, InMemoryPubSubHub, ProvisioningService,
    ProvisioningServiceError, ServiceCollection,
};

/// Provisioning double that replays a scripted state sequence; the final
/// state keeps repeating once the script runs dry.
pub struct ScriptedProvisioning {
    resource_id: Option<String>,
    states: Mutex<VecDeque<DeploymentState>>,
    errors: Vec<String>,
    outputs: HashMap<String, String>,
    pub deploy_calls: AtomicUsize,
    pub state_calls: AtomicUsize,
    pub errors_calls: AtomicUsize,
    pub outputs_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl ScriptedProvisioning {
    pub fn new(resource_id: Option<&str>, states: Vec<DeploymentState>) -> Arc<Self> {
        Arc::new(Self {
            resource_id: resource_id.map(str::to_string),
            states: Mutex::new(states.into()),
            errors: vec!["quota exceeded".to_string()],
            outputs: HashMap::from([
                ("resource_id".to_string(), "res-1".to_string()),
                ("endpoint".to_string(), "https://res-1.example.test".to_string()),
            ]),
            deploy_calls: AtomicUsize::new(0),
            state_calls: AtomicUsize::new(0),
            errors_calls: AtomicUsize::new(0),
            outputs_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl ProvisioningService for ScriptedProvisioning {
    async fn deploy(
        &self,
        _template: serde_json::Value,
    ) -> Result<Option<String>, ProvisioningServiceError> {
        self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.resource_id.clone())
    }

    async fn get_state(
        &self,
        resource_id: &str,
    ) -> Result<DeploymentState, ProvisioningServiceError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock();
        if states.len() > 1 {
            Ok(states.pop_front().unwrap())
        } else {
            states
                .front()
                .copied()
                .ok_or_else(|| ProvisioningServiceError::UnknownResource(resource_id.to_string()))
        }
    }

    async fn get_errors(
        &self,
        _resource_id: &str,
    ) -> Result<Vec<String>, ProvisioningServiceError> {
        self.errors_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.errors.clone())
    }

    async fn get_outputs(
        &self,
        _resource_id: &str,
    ) -> Result<HashMap<String, String>, ProvisioningServiceError> {
        self.outputs_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outputs.clone())
    }

    async fn delete(&self, _resource_id: &str) -> Result<(), ProvisioningServiceError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestHarness {
    pub documents: Arc<InMemoryDocumentStore>,
    pub queue: Arc<InMemoryCommandQueue>,
    pub hub: Arc<InMemoryPubSubHub>,
    pub provisioning: Arc<ScriptedProvisioning>,
    pub services: ServiceCollection,
    pub config: TeamforgeConfig,
}

/// Test config with millisecond-scale timers so polling and retention paths
/// run quickly
pub fn fast_config() -> TeamforgeConfig {
    TeamforgeConfig {
        deployment_poll_interval_ms: 10,
        deployment_error_retention_secs: 1,
        activity_backoff_base_ms: 1,
        activity_backoff_max_ms: 10,
        ..TeamforgeConfig::default()
    }
}

pub fn harness(provisioning: Arc<ScriptedProvisioning>) -> TestHarness {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let queue = Arc::new(InMemoryCommandQueue::new());
    let hub = Arc::new(InMemoryPubSubHub::new());

    let services = ServiceCollection {
        documents: documents.clone(),
        queue: queue.clone(),
        provisioning: provisioning.clone(),
        pubsub: hub.clone(),
        notifications: None,
    };

    TestHarness {
        documents,
        queue,
        hub,
        provisioning,
        services,
        config: fast_config(),
    }
}

pub fn actor() -> User {
    let mut user = User::new("org-1", OrganizationRole::Owner);
    user.id = "user-1".to_string();
    user
}

pub fn organization(id: &str) -> Document {
    let mut org = Organization::new("acme", "Acme");
    org.id = id.to_string();
    Document::Organization(org)
}
