//! In-process transport over the server's own WebSocket sessions.

use crate::broadcast::{DeliveryError, Transport};
use crate::types::ChannelId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};

/// Settings for the channel hub.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Payloads queued per channel before deliveries start waiting.
    pub buffer: usize,

    /// How long a delivery may wait for queue space. Zero fails at once
    /// with `Backpressure` when the queue is full.
    pub delivery_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer: 64,
            delivery_timeout: Duration::from_secs(5),
        }
    }
}

/// Outbound queues of every channel attached to this process.
///
/// A channel id the hub does not know is reported as gone: its socket closed,
/// or belonged to a process that has since restarted.
pub struct ChannelHub {
    channels: RwLock<HashMap<ChannelId, mpsc::Sender<String>>>,
    config: HubConfig,
}

impl ChannelHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Attach a new channel, returning its id and the queue its session drains.
    pub fn attach(&self) -> (ChannelId, mpsc::Receiver<String>) {
        let id = ChannelId::generate();
        let rx = self.attach_as(id.clone());
        (id, rx)
    }

    /// Attach a channel under a known id, replacing any previous queue.
    pub fn attach_as(&self, id: ChannelId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(self.config.buffer.max(1));
        self.channels.write().insert(id, tx);
        rx
    }

    /// Detach a channel. Returns false if it was not attached.
    pub fn detach(&self, id: &ChannelId) -> bool {
        self.channels.write().remove(id).is_some()
    }

    pub fn is_attached(&self, id: &ChannelId) -> bool {
        self.channels.read().contains_key(id)
    }

    /// Number of attached channels.
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[async_trait]
impl Transport for ChannelHub {
    async fn deliver(&self, channel: &ChannelId, payload: &str) -> Result<(), DeliveryError> {
        let sender = self.channels.read().get(channel).cloned();
        let Some(sender) = sender else {
            return Err(DeliveryError::Gone);
        };

        let result = if self.config.delivery_timeout.is_zero() {
            sender.try_send(payload.to_string()).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Backpressure,
                TrySendError::Closed(_) => DeliveryError::Gone,
            })
        } else {
            sender
                .send_timeout(payload.to_string(), self.config.delivery_timeout)
                .await
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => DeliveryError::Timeout,
                    SendTimeoutError::Closed(_) => DeliveryError::Gone,
                })
        };

        if matches!(result, Err(DeliveryError::Gone)) {
            self.detach(channel);
        }
        result
    }
}
