//! Error types for the harness.

use goldblock_core::{AuthError, EncodingError, GraphError};
use goldblock_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur during harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Record fields out of range.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Signature or signer rejected.
    #[error("authorization error: {0}")]
    Auth(#[from] AuthError),

    /// Local graph validation failed.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The ledger assigned a different index than the local graph expected.
    #[error("ledger assigned index {ledger}, local graph expected {local}")]
    IndexMismatch { ledger: u32, local: u32 },

    /// A ledger entry failed validation while the graph was catching up.
    #[error("ledger entry {index} is invalid: {source}")]
    InvalidEntry {
        index: u32,
        #[source]
        source: GraphError,
    },

    /// No record at this index.
    #[error("no record at index {0}")]
    NotFound(u32),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking verification task failed.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
