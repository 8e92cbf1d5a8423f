//! Settings for register storage
//!
//! Loaded from (in order of priority):
//! 1. JSON file in the Courrier config directory (`settings.json`)
//! 2. Environment variables
//! 3. Built-in defaults

use anyhow::{Context, Result};
use config::{ConfigDir, load_json_file};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bus::{DEFAULT_CAPACITY, SyncBus};
use crate::storage::FileKeyValueStore;

/// Settings filename in the Courrier config directory
const SETTINGS_FILE: &str = "settings.json";

const ENV_DATA_DIR: &str = "COURRIER_DATA_DIR";
const ENV_QUOTA_BYTES: &str = "COURRIER_QUOTA_BYTES";
const ENV_BUS_CAPACITY: &str = "COURRIER_BUS_CAPACITY";

/// Resolved storage settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding one file per register partition
    pub data_dir: PathBuf,
    /// Byte quota across all partitions, unbounded when `None`
    pub quota_bytes: Option<u64>,
    /// Per-subscriber buffer of the sync bus
    pub bus_capacity: usize,
}

/// On-disk format; every key is optional
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    data_dir: Option<PathBuf>,
    quota_bytes: Option<u64>,
    bus_capacity: Option<usize>,
}

impl Settings {
    /// Load settings using the following priority:
    /// 1. JSON file (~/.config/courrier/settings.json)
    /// 2. Environment variables
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        match ConfigDir::locate() {
            Some(dir) => Self::from_dir(&dir),
            None => Self::from_env(),
        }
    }

    /// Load settings from `settings.json` in `dir`, falling back to the
    /// environment when the file doesn't exist
    pub fn from_dir(dir: &ConfigDir) -> Result<Self> {
        match dir.load_json::<SettingsFile>(SETTINGS_FILE)? {
            Some(file) => Ok(Self::from_settings_file(file)),
            None => Self::from_env(),
        }
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: SettingsFile = load_json_file(path)?;
        Ok(Self::from_settings_file(file))
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SettingsFile =
            serde_json::from_str(json).context("Failed to parse settings JSON")?;
        Ok(Self::from_settings_file(file))
    }

    /// Load settings from environment variables, defaulting what is unset
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let quota_bytes = lookup(ENV_QUOTA_BYTES)
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("{ENV_QUOTA_BYTES} is not a byte count: {v}"))
            })
            .transpose()?;
        let bus_capacity = lookup(ENV_BUS_CAPACITY)
            .map(|v| {
                v.parse::<usize>()
                    .with_context(|| format!("{ENV_BUS_CAPACITY} is not a number: {v}"))
            })
            .transpose()?;

        Ok(Self::from_settings_file(SettingsFile {
            data_dir: lookup(ENV_DATA_DIR).map(PathBuf::from),
            quota_bytes,
            bus_capacity,
        }))
    }

    fn from_settings_file(file: SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            quota_bytes: file.quota_bytes.or(defaults.quota_bytes),
            bus_capacity: file.bus_capacity.unwrap_or(defaults.bus_capacity),
        }
    }

    /// Open the file-backed storage these settings describe
    pub fn open_storage(&self) -> Result<FileKeyValueStore> {
        Ok(FileKeyValueStore::new(&self.data_dir)?.with_quota(self.quota_bytes))
    }

    /// Create the sync bus these settings describe
    pub fn create_bus(&self) -> SyncBus {
        SyncBus::new(self.bus_capacity)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: ConfigDir::locate()
                .map(|dir| dir.path("data"))
                .unwrap_or_else(|| PathBuf::from("courrier-data")),
            quota_bytes: None,
            bus_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_settings() {
        let json = r#"{
            "data_dir": "/tmp/registres",
            "quota_bytes": 5242880,
            "bus_capacity": 16
        }"#;

        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/registres"));
        assert_eq!(settings.quota_bytes, Some(5_242_880));
        assert_eq!(settings.bus_capacity, 16);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_dir_reads_settings_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ConfigDir::at(tmp.path());
        std::fs::write(dir.path(SETTINGS_FILE), r#"{ "bus_capacity": 4 }"#).unwrap();

        let settings = Settings::from_dir(&dir).unwrap();
        assert_eq!(settings.bus_capacity, 4);
    }

    #[test]
    fn test_from_file_reports_bad_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        std::fs::write(&path, "quota").unwrap();

        assert!(Settings::from_file(&path).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(Settings::from_json("[").is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("COURRIER_DATA_DIR", "/srv/courrier"),
            ("COURRIER_QUOTA_BYTES", "1024"),
        ]);

        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/srv/courrier"));
        assert_eq!(settings.quota_bytes, Some(1024));
        assert_eq!(settings.bus_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_from_lookup_rejects_bad_quota() {
        let err = Settings::from_lookup(|k| (k == "COURRIER_QUOTA_BYTES").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("COURRIER_QUOTA_BYTES"));
    }
}
