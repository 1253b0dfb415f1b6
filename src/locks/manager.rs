//! Lease-based lock manager with FIFO waiter queues.
//!
//! Multi-entity acquisition sorts entity ids canonically before acquiring, so
//! two callers requesting overlapping sets can never deadlock each other.
//! Grants carry a lease; a holder that never releases (crashed worker) can be
//! reclaimed once its lease expires. Idle lock entries are garbage-collected
//! on release.

use crate::constants::system;
use crate::models::data::DocumentKind;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Identity of a lockable entity: `(entity_type, key)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub entity_type: String,
    pub key: String,
}

impl EntityId {
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// Lock id for a container document
    pub fn document(kind: DocumentKind, id: &str) -> Self {
        Self::new(kind.as_str(), id)
    }

    /// Lock id for an external resource identifier
    pub fn resource(resource_id: &str) -> Self {
        Self::new(system::RESOURCE_LOCK_TYPE, resource_id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.entity_type, self.key)
    }
}

struct Holder {
    holder_id: String,
    lease_until: Instant,
}

struct Waiter {
    token: u64,
    holder_id: String,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct LockState {
    holder: Option<Holder>,
    waiters: VecDeque<Waiter>,
}

pub struct LockManager {
    entries: Mutex<HashMap<EntityId, LockState>>,
    lease: Duration,
    next_token: AtomicU64,
}

impl LockManager {
    pub fn new(lease: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            lease,
            next_token: AtomicU64::new(0),
        }
    }

    /// Acquire all named entities for `holder_id`, suspending until every one
    /// is held. Entities are sorted canonically and deduplicated first.
    pub async fn acquire(self: &Arc<Self>, holder_id: &str, entities: &[EntityId]) -> LockGuard {
        let mut sorted: Vec<EntityId> = entities.to_vec();
        sorted.sort();
        sorted.dedup();

        for entity in &sorted {
            self.acquire_one(holder_id, entity).await;
        }

        debug!(holder = %holder_id, count = sorted.len(), "lock set acquired");

        LockGuard {
            manager: Arc::clone(self),
            holder_id: holder_id.to_string(),
            entities: sorted,
            released: false,
        }
    }

    /// Re-entrancy introspection: is `entity` currently held by `holder_id`?
    pub fn is_held_by(&self, holder_id: &str, entity: &EntityId) -> bool {
        let entries = self.entries.lock();
        entries
            .get(entity)
            .and_then(|state| state.holder.as_ref())
            .map(|h| h.holder_id == holder_id && h.lease_until > Instant::now())
            .unwrap_or(false)
    }

    async fn acquire_one(&self, holder_id: &str, entity: &EntityId) {
        loop {
            let pending = {
                let mut entries = self.entries.lock();
                let state = entries.entry(entity.clone()).or_default();

                match &state.holder {
                    None => {
                        state.holder = Some(self.grant(holder_id));
                        None
                    }
                    Some(h) if h.lease_until <= Instant::now() => {
                        warn!(
                            entity = %entity,
                            stale_holder = %h.holder_id,
                            holder = %holder_id,
                            "reclaiming lock with expired lease"
                        );
                        state.holder = Some(self.grant(holder_id));
                        None
                    }
                    Some(_) => {
                        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                        let (tx, rx) = oneshot::channel();
                        state.waiters.push_back(Waiter {
                            token,
                            holder_id: holder_id.to_string(),
                            tx,
                        });
                        Some((token, rx))
                    }
                }
            };

            let Some((token, rx)) = pending else {
                return;
            };

            match tokio::time::timeout(self.lease, rx).await {
                // Ownership was handed off by the releasing holder
                Ok(Ok(())) => return,
                // Sender dropped without a grant; retry from scratch
                Ok(Err(_)) => {}
                // Waited a full lease without a grant: the holder may have
                // crashed. Drop out of the queue and retry, which reclaims
                // the entity if its lease has expired.
                Err(_) => {
                    let mut entries = self.entries.lock();
                    if let Some(state) = entries.get_mut(entity) {
                        // A grant may have landed exactly at the deadline
                        if state
                            .holder
                            .as_ref()
                            .is_some_and(|h| h.holder_id == holder_id)
                        {
                            return;
                        }
                        state.waiters.retain(|w| w.token != token);
                    }
                }
            }
        }
    }

    fn grant(&self, holder_id: &str) -> Holder {
        Holder {
            holder_id: holder_id.to_string(),
            lease_until: Instant::now() + self.lease,
        }
    }

    fn release(&self, holder_id: &str, entity: &EntityId) {
        let mut entries = self.entries.lock();
        let mut drained = false;

        if let Some(state) = entries.get_mut(entity) {
            // Ignore stale releases from holders whose lease was reclaimed
            match &state.holder {
                Some(h) if h.holder_id == holder_id => {}
                _ => return,
            }

            loop {
                match state.waiters.pop_front() {
                    Some(waiter) => {
                        let granted = self.grant(&waiter.holder_id);
                        if waiter.tx.send(()).is_ok() {
                            state.holder = Some(granted);
                            return;
                        }
                        // Waiter gave up; try the next one
                    }
                    None => {
                        state.holder = None;
                        drained = true;
                        break;
                    }
                }
            }
        }

        if drained {
            entries.remove(entity);
        }
    }
}

/// Scope guard for a held lock set; releases every entity on drop, on every
/// exit path
pub struct LockGuard {
    manager: Arc<LockManager>,
    holder_id: String,
    entities: Vec<EntityId>,
    released: bool,
}

impl LockGuard {
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// Release explicitly ahead of scope exit
    pub fn release(mut self) {
        self.release_all();
    }

    fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for entity in &self.entities {
            self.manager.release(&self.holder_id, entity);
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_all();
    }
}
