//! Sync bus distributing register notifications via `tokio::sync::broadcast`
//!
//! The bus is an explicit dependency: create one at application start, hand
//! clones to every store, and it goes away with the last clone. Publishing
//! never blocks; with no subscribers events are dropped.

use log::debug;
use tokio::sync::broadcast::{self, error::TryRecvError};

use super::events::{CourriersUpdated, Notification, StorageChanged};

/// Default broadcast channel capacity
pub const DEFAULT_CAPACITY: usize = 64;

/// Handle on the two notification channels shared by all registers
#[derive(Debug, Clone)]
pub struct SyncBus {
    updates: broadcast::Sender<CourriersUpdated>,
    storage: broadcast::Sender<StorageChanged>,
}

impl SyncBus {
    /// Create a new bus; each channel buffers up to `capacity` notifications
    /// per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (updates, _) = broadcast::channel(capacity);
        let (storage, _) = broadcast::channel(capacity);
        Self { updates, storage }
    }

    /// Announce that a register partition was rewritten
    pub fn publish_update(&self, event: CourriersUpdated) {
        let category = event.category;
        let count = event.data.len();
        match self.updates.send(event) {
            Ok(n) => debug!(
                "CourriersUpdated emitted (category={:?}, courriers={}, subscribers={})",
                category, count, n
            ),
            Err(_) => {
                // No subscribers
            }
        }
    }

    /// Signal that storage changed outside this application's stores
    pub fn notify_storage_changed(&self, key: Option<String>) {
        if let Ok(n) = self.storage.send(StorageChanged { key }) {
            debug!("StorageChanged emitted (subscribers={})", n);
        }
    }

    /// Subscribe to both channels
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            updates: self.updates.subscribe(),
            storage: self.storage.subscribe(),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A live subscription to both channels. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    updates: broadcast::Receiver<CourriersUpdated>,
    storage: broadcast::Receiver<StorageChanged>,
}

impl Subscription {
    /// Take every queued notification without blocking.
    ///
    /// Update notifications come first, then storage-change signals; each
    /// channel keeps its own send order.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();

        loop {
            match self.updates.try_recv() {
                Ok(event) => out.push(Notification::Updated(event)),
                Err(TryRecvError::Lagged(skipped)) => out.push(Notification::Missed { skipped }),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        loop {
            match self.storage.try_recv() {
                Ok(event) => out.push(Notification::StorageChanged(event)),
                Err(TryRecvError::Lagged(skipped)) => out.push(Notification::Missed { skipped }),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        out
    }
}
