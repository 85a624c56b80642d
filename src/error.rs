//! Error types for the live blog.

use crate::broadcast::DeliveryError;
use crate::types::{BlogId, ChannelId, Sequence};
use thiserror::Error;

/// Main error type for blog operations.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Post not found: {blog}/{sequence}")]
    PostNotFound { blog: BlogId, sequence: Sequence },

    #[error("Sequence {sequence} already taken in blog {blog}")]
    SequenceConflict { blog: BlogId, sequence: Sequence },

    #[error("Delivery to channel {channel} failed: {source}")]
    Delivery {
        channel: ChannelId,
        #[source]
        source: DeliveryError,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),
}

impl BlogError {
    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BlogError::InvalidInput(_)
                | BlogError::PostNotFound { .. }
                | BlogError::SequenceConflict { .. }
        )
    }
}

impl From<serde_json::Error> for BlogError {
    fn from(e: serde_json::Error) -> Self {
        BlogError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for BlogError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        BlogError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BlogError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        BlogError::Deserialization(e.to_string())
    }
}

/// Result type for blog operations.
pub type Result<T> = std::result::Result<T, BlogError>;
