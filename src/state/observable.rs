//! Observable value container.
//!
//! Holds an immutable snapshot and a list of subscribers. Every mutation
//! replaces the snapshot and notifies subscribers synchronously, in
//! subscription order, after the internal lock has been released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by [`Observable::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct Inner<T> {
    value: Arc<T>,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
    next_id: u64,
}

/// A value that notifies subscribers whenever it is replaced.
pub struct Observable<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Observable<T> {
    /// Create a container holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: Arc::new(initial),
                subscribers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.lock().value)
    }

    /// Register a subscriber. It receives the current snapshot immediately.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let (id, snapshot) = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::clone(&callback)));
            (id, Arc::clone(&inner.value))
        };

        callback(&snapshot);
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    /// Replace the value and notify.
    pub fn set(&self, value: T) {
        let value = Arc::new(value);
        let subscribers = {
            let mut inner = self.lock();
            inner.value = Arc::clone(&value);
            Self::callbacks(&inner)
        };

        Self::notify(&value, &subscribers);
    }

    /// Derive a new value from the current one.
    ///
    /// `f` returns `None` to leave the value untouched, in which case no
    /// notification is sent. Returns whether the value was replaced.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let (value, subscribers) = {
            let mut inner = self.lock();
            let Some(next) = f(inner.value.as_ref()) else {
                return false;
            };
            inner.value = Arc::new(next);
            (Arc::clone(&inner.value), Self::callbacks(&inner))
        };

        Self::notify(&value, &subscribers);
        true
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn callbacks(inner: &Inner<T>) -> Vec<Callback<T>> {
        inner
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    fn notify(value: &Arc<T>, subscribers: &[Callback<T>]) {
        for callback in subscribers {
            callback(value);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panicking subscriber never runs under the lock, so the data is
        // still consistent after poisoning.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
