//! Event infrastructure for sync monitoring.
//!
//! The orchestrator publishes `SyncEvent`s so hosts can drive a status
//! indicator, write adopted snapshots back to their own surface, or log.
//! `EventBus` follows the disposer pattern: hold the returned
//! `Subscription` to keep receiving events, drop it to unsubscribe.

use crate::orchestrator::SyncStatus;

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Events emitted during sync operations.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    /// Sync status indicator changed.
    StatusChanged {
        status: SyncStatus,
        /// Unix milliseconds
        timestamp: u64,
    },
    /// A push was accepted by the remote.
    SyncCompleted {
        /// Server-assigned version now current on both ends
        version: u64,
        timestamp: u64,
    },
    /// A push failed.
    SyncFailed {
        error: String,
        /// Whether a retry was scheduled
        #[serde(rename = "willRetry")]
        will_retry: bool,
        timestamp: u64,
    },
    /// A newer remote snapshot was adopted into the editing surface.
    RemoteAdopted { version: u64, timestamp: u64 },
    /// A pull found real divergence; resolution is required before the
    /// next push.
    ConflictDetected {
        #[serde(rename = "localVersion")]
        local_version: u64,
        #[serde(rename = "serverVersion")]
        server_version: u64,
        timestamp: u64,
    },
    /// The active conflict was resolved.
    ConflictResolved {
        strategy: String,
        version: u64,
        timestamp: u64,
    },
    /// An unclean shutdown left newer local state; the host should offer
    /// restore-from-cache or discard.
    RecoveryAvailable {
        #[serde(rename = "cachedVersion")]
        cached_version: u64,
        timestamp: u64,
    },
}

/// Subscription handle that unsubscribes automatically when dropped.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: usize,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

/// Event bus for publishing sync events to subscribers.
///
/// Wrap in `Arc` to enable subscriptions.
pub struct EventBus {
    callbacks: RwLock<Vec<(usize, Arc<dyn Fn(SyncEvent) + Send + Sync>)>>,
    next_id: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events. Returns a `Subscription` that unsubscribes on
    /// drop. Requires `self` to be wrapped in `Arc`.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(SyncEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        Subscription {
            bus: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: usize) {
        // try_write so a Subscription dropped during panic unwinding while
        // emit holds the read lock cannot deadlock.
        if let Ok(mut guard) = self.callbacks.try_write() {
            guard.retain(|(i, _)| *i != id);
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: SyncEvent) {
        // Snapshot the callback list so a callback that subscribes does not
        // deadlock against the emit.
        let callbacks: Vec<_> = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event.clone());
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
