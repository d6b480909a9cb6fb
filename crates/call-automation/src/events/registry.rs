//! Subscription registry
//!
//! At most one callback per [`CorrelationKey`]. Map guards are released
//! before a callback is returned to the caller, so invocation never runs
//! under a registry lock.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::key::CorrelationKey;
use super::types::CallEvent;

type CallbackFn = dyn Fn(CallEvent) -> BoxFuture<'static, ()> + Send + Sync;

/// A callback waiting for one correlated event
#[derive(Clone)]
pub struct NotificationCallback {
    callback: Arc<CallbackFn>,
}

impl NotificationCallback {
    /// Wrap an async callback
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(CallEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            callback: Arc::new(move |event: CallEvent| callback(event).boxed()),
        }
    }

    /// Wrap a synchronous callback
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(CallEvent) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        Self::new(move |event| {
            let callback = Arc::clone(&callback);
            async move { callback(event) }
        })
    }

    /// Produce the future that runs this callback for `event`
    pub fn invoke(&self, event: CallEvent) -> BoxFuture<'static, ()> {
        (self.callback)(event)
    }

    /// Whether two handles share the same callback
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for NotificationCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCallback").finish_non_exhaustive()
    }
}

/// Concurrent map from correlation key to its single callback
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: DashMap<CorrelationKey, NotificationCallback>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `key`.
    ///
    /// Returns `false`, leaving the existing callback in place, when the key
    /// is already taken.
    pub fn subscribe(&self, key: CorrelationKey, callback: NotificationCallback) -> bool {
        match self.subscriptions.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(callback);
                true
            }
        }
    }

    /// Remove the registration for `key`; returns whether one existed
    pub fn unsubscribe(&self, key: &CorrelationKey) -> bool {
        self.subscriptions.remove(key).is_some()
    }

    /// Look up the callback for `key`
    pub fn get(&self, key: &CorrelationKey) -> Option<NotificationCallback> {
        self.subscriptions.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &CorrelationKey) -> bool {
        self.subscriptions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&self) {
        self.subscriptions.clear();
    }
}
