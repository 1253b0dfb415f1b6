use crate::models::command::CommandKind;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug)]
enum MetricSignal {
    Increment(String),
    Decrement(String),
    Reset(String),
}

/// Tracks how many commands of each kind are currently being handled.
#[derive(Clone)]
pub struct CommandMetricTracker {
    counters: Arc<DashMap<String, i64>>,
    tx: mpsc::UnboundedSender<MetricSignal>,
}

impl CommandMetricTracker {
    pub fn new() -> Self {
        let counters: Arc<DashMap<String, i64>> = Arc::new(DashMap::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let drain = Arc::clone(&counters);
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                match signal {
                    MetricSignal::Increment(kind) => {
                        *drain.entry(kind).or_insert(0) += 1;
                    }
                    MetricSignal::Decrement(kind) => {
                        let mut entry = drain.entry(kind.clone()).or_insert(0);
                        *entry -= 1;
                        if *entry < 0 {
                            warn!(kind = %kind, "in-flight counter went negative, clamping");
                            *entry = 0;
                        }
                    }
                    MetricSignal::Reset(kind) => {
                        drain.insert(kind, 0);
                    }
                }
            }
        });

        Self { counters, tx }
    }

    /// Scoped guard that increments now and decrements when dropped,
    /// success or failure
    pub fn track(&self, kind: CommandKind) -> TrackerGuard {
        let key = kind.to_string();
        self.signal(MetricSignal::Increment(key.clone()));
        TrackerGuard {
            tx: self.tx.clone(),
            kind: key,
        }
    }

    /// Clear a counter for operational recovery
    pub fn reset(&self, kind: CommandKind) {
        self.signal(MetricSignal::Reset(kind.to_string()));
    }

    /// Current in-flight count for a kind; eventually consistent with the
    /// signal channel
    pub fn in_flight(&self, kind: CommandKind) -> i64 {
        self.counters
            .get(&kind.to_string())
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    fn signal(&self, signal: MetricSignal) {
        if self.tx.send(signal).is_err() {
            debug!("metric drain task gone, dropping signal");
        }
    }
}

impl Default for CommandMetricTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the owning kind's counter on drop
pub struct TrackerGuard {
    tx: mpsc::UnboundedSender<MetricSignal>,
    kind: String,
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        if self
            .tx
            .send(MetricSignal::Decrement(self.kind.clone()))
            .is_err()
        {
            debug!("metric drain task gone, dropping decrement");
        }
    }
}
