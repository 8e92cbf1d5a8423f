//! Errors surfaced by the strict store operations

use thiserror::Error;

use crate::storage::StorageError;

/// Failure of a register load or save.
///
/// The default operations log and absorb these; `try_load` / `try_save`
/// return them.
#[derive(Debug, Error)]
pub enum CourrierError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to serialize courriers: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Stored text under `key` is not a valid courrier list
    #[error("corrupt data under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
