//! Storage-layer error types.

use thiserror::Error;

/// Errors surfaced by the storage engine and versioned repositories.
///
/// This is the `StorageError` kind referenced by the higher-level facade
/// error: anything the backend itself refuses, or any corruption found
/// while decoding what it returns, lands here.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid key format")]
    InvalidKey,
}
