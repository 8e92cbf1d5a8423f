//! Notification payloads carried by the sync bus

use serde::{Deserialize, Serialize};

use crate::models::{Category, Courrier};

/// What happened to a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    /// The whole collection was replaced
    Update,
}

/// Raised after a register partition was successfully rewritten.
///
/// `category: None` addresses every register. Receivers reload from storage
/// and never trust `data` as authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourriersUpdated {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub action: UpdateAction,
    #[serde(default)]
    pub data: Vec<Courrier>,
}

impl CourriersUpdated {
    pub fn new(category: Category, data: Vec<Courrier>) -> Self {
        Self {
            category: Some(category),
            action: UpdateAction::Update,
            data,
        }
    }

    /// An update addressed to every register
    pub fn broadcast() -> Self {
        Self {
            category: None,
            action: UpdateAction::Update,
            data: Vec::new(),
        }
    }

    /// Whether a register bound to `category` should react
    pub fn concerns(&self, category: Category) -> bool {
        self.category.is_none_or(|c| c == category)
    }
}

/// Raised by the storage layer when a partition changed underneath the
/// application (another process, an external edit). Only a wake-up signal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageChanged {
    /// Key that changed, when the source knows it
    pub key: Option<String>,
}

/// One item drained from a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Updated(CourriersUpdated),
    StorageChanged(StorageChanged),
    /// The subscriber fell behind and `skipped` notifications were lost
    Missed { skipped: u64 },
}
