//! In-memory storage implementation
//!
//! Used by tests and by hosts that do not need persistence across runs.
//! An optional byte quota mimics capacity-bounded browser storage.

use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::{KeyValueStore, StorageError, entry_size};

/// In-memory implementation of KeyValueStore
///
/// Uses a HashMap protected by an RwLock for thread-safe access.
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
    /// Maximum total bytes (keys + values), if bounded
    quota_bytes: Option<u64>,
}

impl InMemoryKeyValueStore {
    /// Create a new empty, unbounded store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Create a new empty store that rejects writes past `quota_bytes`
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently used by keys and values
    pub fn used_bytes(&self) -> u64 {
        let entries = self.entries.read().unwrap();
        entries.iter().map(|(k, v)| entry_size(k, v)).sum()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap();

        if let Some(quota) = self.quota_bytes {
            // Size after the write: everything except the replaced entry, plus the new one
            let others: u64 = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_size(k, v))
                .sum();
            let needed = others + entry_size(key, value);
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap();
        entries.clear();
        Ok(())
    }
}
