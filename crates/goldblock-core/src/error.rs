//! Error types for the gold block core.

use thiserror::Error;

use crate::types::{Address, ContentId};

/// A field value that cannot be represented at its declared wire width.
///
/// These are caller-input failures: fix the input, never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("weight {0} exceeds the 32-bit range")]
    WeightOverflow(u64),

    #[error("parent id {value} at position {position} exceeds the 32-bit range")]
    ParentOverflow { position: usize, value: u64 },

    #[error("timestamp needs {0} significant bytes, at most 32 allowed")]
    TimestampOverflow(usize),

    #[error("invalid timestamp literal: {0}")]
    InvalidTimestamp(String),

    #[error("producer code must be exactly 2 bytes, got {0}")]
    ProducerWidth(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Failures while checking a signature over a content id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signer {0} is not authorized")]
    UnauthorizedSubmission(Address),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors raised by the provenance graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("parent index {parent} has not been assigned")]
    UnknownParent { parent: u32 },

    #[error("record id {id} already admitted at index {index} with different fields")]
    DuplicateIdConflict { id: String, index: u32 },

    #[error("signer {0} is not authorized")]
    UnauthorizedSubmission(Address),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("index {0} is not assigned")]
    UnknownIndex(u32),

    #[error("content id mismatch at index {index}: stored {stored}, computed {computed}")]
    ContentIdMismatch {
        index: u32,
        stored: ContentId,
        computed: ContentId,
    },

    #[error("out of order import: expected index {expected}, got {got}")]
    OutOfOrder { expected: u32, got: u32 },

    #[error("sequence index space exhausted")]
    IndexSpaceExhausted,

    /// An invariant was violated despite validation. The graph refuses all
    /// further mutation once this has been observed.
    #[error("graph corruption: {0}")]
    GraphCorruption(String),
}

impl GraphError {
    /// Whether this error leaves the graph unusable for mutation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GraphError::GraphCorruption(_))
    }
}

impl From<AuthError> for GraphError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UnauthorizedSubmission(addr) => GraphError::UnauthorizedSubmission(addr),
            AuthError::MalformedSignature(msg) => GraphError::MalformedSignature(msg),
            AuthError::InvalidKey(msg) | AuthError::Signing(msg) => {
                GraphError::MalformedSignature(msg)
            }
        }
    }
}
