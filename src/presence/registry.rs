//! Identity → connection-handles multimap with count fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::observability::metrics;

/// Concurrency-safe registry of live viewers.
///
/// Each identity (device token, else client IP) maps to the set of its open
/// transport connections. The unique-viewer count is the number of distinct
/// identities; identities with no remaining handles are removed immediately.
///
/// Every mutation publishes the recomputed count on a broadcast channel.
/// The publish happens while the map lock is held, so observers receive
/// counts in exactly the order the mutations were applied.
pub struct PresenceRegistry {
    viewers: Mutex<HashMap<String, HashSet<Uuid>>>,
    count_tx: broadcast::Sender<usize>,
}

impl PresenceRegistry {
    /// Create a registry whose observers may lag by up to `broadcast_capacity`
    /// events before skipping ahead.
    pub fn new(broadcast_capacity: usize) -> Self {
        let (count_tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            viewers: Mutex::new(HashMap::new()),
            count_tx,
        }
    }

    /// Add `handle` to `identity`'s connection set, creating the identity on
    /// first registration. Idempotent per handle. Broadcasts the new count.
    pub fn register(&self, identity: &str, handle: Uuid) -> usize {
        let mut viewers = self.viewers.lock().expect("presence registry mutex poisoned");
        viewers.entry(identity.to_string()).or_default().insert(handle);
        let count = viewers.len();

        tracing::debug!(
            identity = %identity,
            handle = %handle,
            online = count,
            "Viewer connection registered"
        );

        self.publish(count);
        count
    }

    /// Remove `handle` from `identity`'s connection set. Removing a handle
    /// that is not registered is a no-op (disconnect events may race or
    /// duplicate). The identity is dropped with its last handle. Always
    /// broadcasts, even when the count did not change.
    pub fn deregister(&self, identity: &str, handle: &Uuid) -> usize {
        let mut viewers = self.viewers.lock().expect("presence registry mutex poisoned");
        if let Some(handles) = viewers.get_mut(identity) {
            handles.remove(handle);
            if handles.is_empty() {
                viewers.remove(identity);
            }
        }
        let count = viewers.len();

        tracing::debug!(
            identity = %identity,
            handle = %handle,
            online = count,
            "Viewer connection deregistered"
        );

        self.publish(count);
        count
    }

    /// Number of distinct identities currently connected.
    pub fn count(&self) -> usize {
        self.viewers.lock().expect("presence registry mutex poisoned").len()
    }

    /// Subscribe to count updates. Each receiver sees counts in emission
    /// order; a lagged receiver resumes at the most recent events.
    pub fn subscribe(&self) -> broadcast::Receiver<usize> {
        self.count_tx.subscribe()
    }

    fn publish(&self, count: usize) {
        // Errors only mean no observer is currently subscribed.
        let _ = self.count_tx.send(count);
        metrics::set_online_viewers(count);
    }
}
