//! Storage trait definitions

use thiserror::Error;

/// Errors raised by a key-value backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would push the store past its byte quota
    #[error("quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: u64,
        quota: u64,
    },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for key-value persistence of register partitions
///
/// Each register category is stored under one fixed key holding the whole
/// collection as JSON text. Writes replace the value wholesale and may fail
/// when the backend is capacity-bounded.
pub trait KeyValueStore: Send + Sync {
    /// Read the text stored under `key`, or `None` if the key is absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the text stored under `key`
    ///
    /// On failure the previous value is left untouched.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; deleting an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every key
    fn clear(&self) -> Result<(), StorageError>;
}

/// Size a key/value pair counts against a quota
pub(crate) fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}
