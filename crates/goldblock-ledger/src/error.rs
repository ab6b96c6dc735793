//! Error types for the ledger module.

use goldblock_core::EncodingError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The ledger refused the append (unknown parent, conflicting id).
    #[error("append rejected: {0}")]
    Rejected(String),

    /// Stored fields no longer fit their wire widths.
    #[error("stored record does not encode: {0}")]
    Encoding(#[from] EncodingError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend could not be reached (poisoned lock, failed blocking task).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
