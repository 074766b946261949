//! Change listeners for coordinator updates
//!
//! Subscribers register a callback and get back a [`Subscription`] guard.
//! The guard only holds a weak reference to the set, so a dropped
//! coordinator never keeps its subscribers alive and vice versa.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::state::CoordinatorData;

type Callback = Arc<dyn Fn(&CoordinatorData) + Send + Sync>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    // A panicking listener must not disable notifications for everyone else
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set of callbacks notified after every refresh outcome
#[derive(Default)]
pub struct ListenerSet {
    inner: Arc<Mutex<Inner>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CoordinatorData) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            set: Some(Arc::downgrade(&self.inner)),
        }
    }

    /// Call every registered callback with `data`
    ///
    /// Callbacks run outside the lock, so they may subscribe or unsubscribe.
    pub fn notify(&self, data: &CoordinatorData) {
        let callbacks: Vec<Callback> = lock(&self.inner)
            .entries
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(data);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guard returned by [`ListenerSet::subscribe`]; unsubscribes on drop
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    set: Option<Weak<Mutex<Inner>>>,
}

impl Subscription {
    /// Stop receiving notifications
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered for the lifetime of the coordinator
    pub fn detach(mut self) {
        self.set = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.set.take().and_then(|weak| weak.upgrade()) {
            lock(&inner).entries.retain(|(id, _)| *id != self.id);
        }
    }
}
