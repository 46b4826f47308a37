//! Synchronous change-notification fan-out.
//!
//! Listeners are called on the caller's thread, in subscription order, once
//! per [`PropChange`]. The listener list is snapshotted before delivery so a
//! listener may read the store, subscribe, or unsubscribe while handling a
//! change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::PropChange;

/// Receives property-change notifications.
pub trait ChangeListener: Send + Sync {
    fn prop_changed(&self, change: &PropChange);
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Ordered set of listeners with subscribe/unsubscribe/broadcast.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn ChangeListener>)>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener; it receives every broadcast until unsubscribed.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners
            .write()
            .expect("listener lock poisoned")
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns `true` if it was subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().expect("listener lock poisoned");
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    /// Deliver a change to every listener.
    pub fn broadcast(&self, change: &PropChange) {
        let snapshot: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .read()
            .expect("listener lock poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener.prop_changed(change);
        }
    }

    /// Number of subscribed listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().expect("listener lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.write().expect("listener lock poisoned").clear();
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}
