//! Error types for local journal operations.

use thiserror::Error;

use crate::types::StoreId;

/// Errors raised by local journal operations.
#[derive(Error, Debug, Clone)]
pub enum JournalError {
    /// The requested store UUID matches no locally known journal.
    #[error("Unknown store: {0}")]
    UnknownStore(StoreId),

    /// A root block failed validation against the current pair.
    #[error("Invalid root block: {reason}")]
    InvalidRootBlock {
        /// Why the root block was rejected.
        reason: String,
    },

    /// The local journal cannot answer yet (e.g. still recovering).
    #[error("Journal not ready: {reason}")]
    NotReady {
        /// Why the journal cannot answer.
        reason: String,
    },

    /// Root block serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
