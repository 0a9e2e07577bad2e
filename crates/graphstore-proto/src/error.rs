//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding or decoding a [`crate::data::Data`] payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("unknown value tag: {0}")]
    UnknownTag(u8),

    #[error("truncated payload")]
    Truncated,
}
