//! Register category (incoming vs outgoing mail)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage key for the incoming mail register
pub const ARRIVE_STORAGE_KEY: &str = "nbh_courriers_arrive";
/// Storage key for the outgoing mail register
pub const DEPART_STORAGE_KEY: &str = "nbh_courriers_depart";

/// Which register a courrier belongs to.
///
/// Each category owns exactly one storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Incoming mail
    Arrive,
    /// Outgoing mail
    Depart,
}

impl Category {
    /// Fixed storage key of this category's partition
    pub fn storage_key(&self) -> &'static str {
        match self {
            Category::Arrive => ARRIVE_STORAGE_KEY,
            Category::Depart => DEPART_STORAGE_KEY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Arrive => "ARRIVE",
            Category::Depart => "DEPART",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ARRIVE" => Ok(Category::Arrive),
            "DEPART" => Ok(Category::Depart),
            other => Err(format!("unknown category: {other}")),
        }
    }
}
