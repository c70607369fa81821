//! Callback subscriptions keyed by handle.
//!
//! Subscribing returns a [`SubscriptionId`]; passing it back to
//! [`ObserverList::unsubscribe`] removes the callback. Handles are unique
//! across every list in the process, so one owner may route a handle to
//! whichever of its lists holds it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle identifying a registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A set of callbacks notified in subscription order.
pub struct ObserverList<T> {
    callbacks: Mutex<BTreeMap<SubscriptionId, Callback<T>>>,
}

impl<T> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        self.lock().insert(id, Arc::new(callback));
        id
    }

    /// Remove a callback. Returns false if the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Invoke every registered callback with `value`.
    ///
    /// Callbacks run outside the internal lock, so they may subscribe or
    /// unsubscribe without deadlocking.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self.lock().values().cloned().collect();
        for callback in snapshot {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SubscriptionId, Callback<T>>> {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("subscribers", &self.len())
            .finish()
    }
}
