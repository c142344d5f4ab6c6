//! Error taxonomy for the signing-state lifecycle

use hbsig_crypto::CryptoError;
use thiserror::Error;

/// Failures of the durable storage collaborator
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum StateError {
    /// Every leaf in this state's range has been consumed. Fatal for the key.
    #[error("State exhausted: no one-time signatures remain (limit {max_leaf_index})")]
    StateExhausted { max_leaf_index: u64 },

    /// Caller error; nothing was mutated
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    /// Persisted state failed validation. Restore from a trusted backup or
    /// retire the key; never patch it up.
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// No leaf was consumed, the whole operation may be retried
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),
}

impl StateError {
    /// Only storage failures are safe to retry as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

impl From<CryptoError> for StateError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidDigestLength { expected, actual } => Self::InvalidDigestLength { expected, actual },
            other => Self::Crypto(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
