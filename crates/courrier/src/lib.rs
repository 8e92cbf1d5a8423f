//! Courrier crate - persisted, synchronized mail registers
//!
//! This crate keeps the incoming (ARRIVE) and outgoing (DEPART) mail
//! registers of an application:
//! - Domain models (Courrier, CourrierDraft, Category)
//! - Key-value storage trait with in-memory and file-backed implementations
//! - Sync bus notifying every open register when a partition changes
//! - Register stores exposing add/update/update_status/remove/refresh
//! - Settings loading for hosts
//!
//! This crate has zero UI dependencies; views own a `CourrierStore` each and
//! call `process_notifications` from their event loop.

pub mod bus;
pub mod clock;
pub mod models;
pub mod settings;
pub mod storage;
pub mod store;

pub use bus::{CourriersUpdated, Notification, StorageChanged, Subscription, SyncBus, UpdateAction};
pub use clock::{Clock, ManualClock, SystemClock};
pub use models::{Category, Courrier, CourrierDraft, CourrierId, Fields, Patch, STATUS_FIELD};
pub use settings::Settings;
pub use storage::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StorageError};
pub use store::{CourrierError, CourrierStore};
