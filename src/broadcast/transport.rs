//! Push transport abstraction.

use crate::types::ChannelId;
use async_trait::async_trait;
use thiserror::Error;

/// Why a single delivery failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The channel no longer exists. Expected: the registry entry is stale.
    #[error("channel is gone")]
    Gone,

    /// The channel did not accept the payload in time.
    #[error("delivery timed out")]
    Timeout,

    /// The channel's outbound queue is full.
    #[error("channel queue is full")]
    Backpressure,

    #[error("delivery failed: {0}")]
    Failed(String),
}

impl DeliveryError {
    /// True for the well-known "channel gone" outcome, which is healed by
    /// pruning rather than reported.
    pub fn is_gone(&self) -> bool {
        matches!(self, DeliveryError::Gone)
    }
}

/// Delivers serialized payloads to individual push channels.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, channel: &ChannelId, payload: &str) -> Result<(), DeliveryError>;
}
