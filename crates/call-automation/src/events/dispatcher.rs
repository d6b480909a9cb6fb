//! # Event Dispatcher
//!
//! Correlates inbound webhook notifications with the callbacks registered by
//! whoever started the matching call operation.
//!
//! ```text
//! webhook body ──► parse_events ──► build_event_key ──► SubscriptionRegistry
//!                                                            │
//!                                         LayerTaskManager ◄─┘ (spawned, not awaited)
//! ```
//!
//! The dispatcher is an ordinary value: construct one per process (or per
//! test) and share it behind an `Arc`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use callflow_call_automation::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let dispatcher = EventDispatcher::new(DispatcherConfig::default());
//!
//! dispatcher.subscribe(
//!     EventKind::CallConnected,
//!     "call-leg-1",
//!     NotificationCallback::new(|event| async move {
//!         tracing::info!("connected: {:?}", event.call_connection_id);
//!     }),
//! );
//!
//! // from the webhook handler
//! dispatcher.process_notification(r#"{"type":"Microsoft.Communication.CallConnected",
//!     "data":{"callConnectionId":"call-leg-1"}}"#);
//!
//! dispatcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use callflow_infra_common::LayerTaskManager;
use tracing::{debug, info, warn};

use super::key::{CorrelationKey, build_event_key};
use super::parser::parse_events;
use super::registry::{NotificationCallback, SubscriptionRegistry};
use super::types::{EventKind, strip_type_prefix};
use crate::config::DispatcherConfig;
use crate::error::Result;

/// Routes inbound events to at most one subscribed callback each
#[derive(Debug)]
pub struct EventDispatcher {
    registry: SubscriptionRegistry,
    tasks: LayerTaskManager,
    stats: DispatchCounters,
}

#[derive(Debug, Default)]
struct DispatchCounters {
    received: AtomicU64,
    dropped_unparsed: AtomicU64,
    unmatched: AtomicU64,
    dispatched: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of dispatcher activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherStats {
    /// Payloads handed to `process_notification`
    pub received: u64,
    /// Payloads that yielded no recognizable event
    pub dropped_unparsed: u64,
    /// Events with no subscriber
    pub unmatched: u64,
    /// Callbacks scheduled
    pub dispatched: u64,
    /// Callbacks the task manager refused to run
    pub rejected: u64,
}

impl EventDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            tasks: LayerTaskManager::with_config(
                "event-dispatch",
                config.max_in_flight_callbacks,
                config.shutdown_grace(),
            ),
            stats: DispatchCounters::default(),
        }
    }

    /// Register `callback` for the next events of `event_type` on `call_leg_id`.
    ///
    /// Returns `false` when that key already has a callback; the existing one
    /// stays registered.
    pub fn subscribe(
        &self,
        event_type: impl AsRef<str>,
        call_leg_id: &str,
        callback: NotificationCallback,
    ) -> bool {
        let key = subscription_key(event_type.as_ref(), call_leg_id);
        let added = self.registry.subscribe(key.clone(), callback);
        if added {
            debug!("Subscribed {}", key);
        } else {
            debug!("Subscription {} already exists", key);
        }
        added
    }

    /// Drop the callback for `event_type` on `call_leg_id`, if any
    pub fn unsubscribe(&self, event_type: impl AsRef<str>, call_leg_id: &str) {
        let key = subscription_key(event_type.as_ref(), call_leg_id);
        if self.registry.unsubscribe(&key) {
            debug!("Unsubscribed {}", key);
        }
    }

    /// Handle one webhook body.
    ///
    /// Never fails and never waits for callbacks: each matched callback is
    /// spawned on a tracked task. Returns how many callbacks were scheduled.
    pub fn process_notification(&self, payload: &str) -> usize {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let events = parse_events(payload);
        if events.is_empty() {
            self.stats.dropped_unparsed.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        let mut scheduled = 0;
        for event in events {
            // parse_events only yields events that carry their correlation id
            let Some(call_leg_id) = event.call_leg_id() else {
                continue;
            };
            let key = build_event_key(event.kind.as_str(), call_leg_id);

            let Some(callback) = self.registry.get(&key) else {
                self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
                debug!("No subscriber for {}, dropping event", key);
                continue;
            };

            match self.tasks.spawn_tracked(key.to_string(), callback.invoke(event)) {
                Ok(task_id) => {
                    self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
                    debug!("📨 Dispatched {} on task {}", key, task_id);
                    scheduled += 1;
                }
                Err(e) => {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!("⚠️ Dropping {}: {}", key, e);
                }
            }
        }

        scheduled
    }

    pub fn is_subscribed(&self, event_type: impl AsRef<str>, call_leg_id: &str) -> bool {
        self.registry
            .contains(&subscription_key(event_type.as_ref(), call_leg_id))
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Callbacks currently running
    pub fn in_flight(&self) -> usize {
        self.tasks.active_task_count()
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            received: self.stats.received.load(Ordering::Relaxed),
            dropped_unparsed: self.stats.dropped_unparsed.load(Ordering::Relaxed),
            unmatched: self.stats.unmatched.load(Ordering::Relaxed),
            dispatched: self.stats.dispatched.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
        }
    }

    /// Stop dispatching, wait for running callbacks within the grace period,
    /// then cancel the rest. Subscriptions are cleared.
    pub async fn shutdown(&self) -> Result<()> {
        info!(
            "🛑 Shutting down event dispatcher ({} callbacks in flight, {} subscriptions)",
            self.in_flight(),
            self.registry.len()
        );
        self.tasks.shutdown_all().await?;
        self.registry.clear();
        Ok(())
    }
}

/// Subscribers may name the type with or without the namespace prefix.
///
/// Known kinds key on their canonical name, the same text dispatch uses.
fn subscription_key(event_type: &str, call_leg_id: &str) -> CorrelationKey {
    match EventKind::from_type_name(event_type) {
        Some(kind) => build_event_key(kind.as_str(), call_leg_id),
        None => build_event_key(strip_type_prefix(event_type), call_leg_id),
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}
