//! Listener bookkeeping shared by the module sources and the theme signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A change listener.
pub type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

/// An ordered set of listeners notified in subscription order.
///
/// Listeners must not subscribe or unsubscribe from inside a callback.
pub struct ListenerSet<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

impl<T> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener.
    pub fn add(&self, listener: Listener<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener with `value`.
    pub fn notify(&self, value: &T) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, listener) in listeners.iter() {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
