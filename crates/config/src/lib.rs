//! Configuration directory for Courrier applications
//!
//! All Courrier tools share one directory (~/.config/courrier/ by default,
//! or `$COURRIER_CONFIG_DIR`). Settings files and the default data
//! directory live under it.
//!
//! Call [`init`] at application startup to bootstrap the directory.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "COURRIER_CONFIG_DIR";

/// A Courrier configuration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Locate the config directory: `$COURRIER_CONFIG_DIR` if set,
    /// otherwise `courrier/` under the platform config directory
    pub fn locate() -> Option<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Some(Self::at(dir));
        }
        dirs::config_dir().map(|p| Self::at(p.join("courrier")))
    }

    /// Use an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the directory (it need not exist)
    pub fn path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Check if a file exists in the directory
    pub fn exists(&self, filename: &str) -> bool {
        self.path(filename).exists()
    }

    /// Create the directory if needed
    pub fn ensure(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create config directory: {}", self.root.display())
        })?;
        Ok(&self.root)
    }

    /// Load a JSON file from the directory; `Ok(None)` when it doesn't exist
    pub fn load_json<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.path(filename);
        if !path.exists() {
            return Ok(None);
        }
        load_json_file(&path).map(Some)
    }

    /// Save a value as JSON into the directory, creating it if needed
    pub fn save_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<PathBuf> {
        self.ensure()?;
        let path = self.path(filename);
        save_json_file(&path, value)?;
        Ok(path)
    }
}

/// Locate and create the config directory.
///
/// Call this once at application startup.
pub fn init() -> Result<ConfigDir> {
    let dir = ConfigDir::locate().context("Could not determine config directory")?;
    dir.ensure()?;
    Ok(dir)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Save a value as pretty JSON to an arbitrary path
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
