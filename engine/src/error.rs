//! Error types for the statesync engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the statesync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Hashing errors
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("integrity check failed for '{id}': expected {expected}, got {actual}")]
    Integrity {
        id: String,
        expected: String,
        actual: String,
    },

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Whether this error means data failed fingerprint verification.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
