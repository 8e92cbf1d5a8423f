//! Storage traits and implementations
//!
//! This module defines the key-value abstraction that register partitions
//! are persisted through. The trait-based design allows swapping between
//! in-memory and file-backed storage.

mod file;
mod memory;
mod traits;

pub use file::FileKeyValueStore;
pub use memory::InMemoryKeyValueStore;
pub use traits::{KeyValueStore, StorageError};
