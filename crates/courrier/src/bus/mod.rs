//! Same-process notification bus
//!
//! Two channels: register updates published by stores after a successful
//! save, and storage-change signals raised by whatever watches the backend.

mod events;
mod sync_bus;

pub use events::{CourriersUpdated, Notification, StorageChanged, UpdateAction};
pub use sync_bus::{DEFAULT_CAPACITY, Subscription, SyncBus};
