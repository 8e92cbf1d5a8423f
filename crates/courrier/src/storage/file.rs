//! File-based key-value storage
//!
//! Directory structure:
//! ```text
//! data/
//!   nbh_courriers_arrive.json
//!   nbh_courriers_depart.json
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::traits::{KeyValueStore, StorageError, entry_size};

const VALUE_EXTENSION: &str = "json";

/// File-based key-value storage, one file per key
pub struct FileKeyValueStore {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileKeyValueStore {
    /// Create a new file store rooted at the given path
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage directory: {}", root.display()))?;
        Ok(Self {
            root,
            quota_bytes: None,
        })
    }

    /// Bound the total size of stored keys and values
    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the file path for a key
    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", sanitize_key(key), VALUE_EXTENSION))
    }

    /// Bytes used by every stored key except `skip`
    fn used_bytes_except(&self, skip: &Path) -> Result<u64, StorageError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            let key_len = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map_or(0, |s| s.len() as u64);
            total += key_len + fs::metadata(&path)?.len();
        }
        Ok(total)
    }
}

/// Keep keys usable as file names
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.value_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.value_path(key);

        if let Some(quota) = self.quota_bytes {
            // Stored keys are measured by file stem, so measure this one the same way
            let needed = self.used_bytes_except(&path)? + entry_size(&sanitize_key(key), value);
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        // Ensure root exists (it may have been cleared externally)
        fs::create_dir_all(&self.root)?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("tmp");
        if let Err(e) = fs::write(&temp_path, value).and_then(|()| fs::rename(&temp_path, &path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }
}
