//! Fan-out of new content to every live channel of a topic.

use super::transport::Transport;
use crate::error::{BlogError, Result};
use crate::registry::SubscriberRegistry;
use crate::types::{ChannelId, Topic};
use futures::future::join_all;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened during one broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastReport {
    pub topic: Topic,
    /// Channels a delivery was attempted to.
    pub attempted: usize,
    pub delivered: usize,
    /// Stale channels removed from the registry.
    pub pruned: Vec<ChannelId>,
}

/// Outcome of one delivery that did not fail the broadcast.
enum Delivered {
    Ok,
    Gone,
}

/// Delivers payloads to all channels registered under a topic.
///
/// Deliveries run concurrently and the call waits for all of them. Channels
/// the transport reports as gone are removed from the registry once every
/// delivery has settled. Any other delivery failure is returned after that,
/// and a failed removal is returned when no delivery failed.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<dyn SubscriberRegistry>,
    transport: Arc<dyn Transport>,
}

impl Broadcaster {
    pub fn new(registry: Arc<dyn SubscriberRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<dyn SubscriberRegistry> {
        &self.registry
    }

    /// Serialize `payload` once and send it to every channel of `topic`.
    pub async fn broadcast<T>(&self, topic: Topic, payload: &T) -> Result<BroadcastReport>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(payload)?;
        self.broadcast_raw(topic, &payload).await
    }

    /// Send an already serialized payload to every channel of `topic`.
    pub async fn broadcast_raw(&self, topic: Topic, payload: &str) -> Result<BroadcastReport> {
        let channels = self.registry.list_all(topic)?;
        debug!(%topic, channels = channels.len(), bytes = payload.len(), "broadcasting");

        let outcomes = join_all(
            channels
                .iter()
                .map(|channel| self.deliver(topic, channel, payload)),
        )
        .await;

        let mut report = BroadcastReport {
            topic,
            attempted: channels.len(),
            delivered: 0,
            pruned: Vec::new(),
        };
        let mut gone = Vec::new();
        let mut first_error = None;

        for (channel, outcome) in channels.into_iter().zip(outcomes) {
            match outcome {
                Ok(Delivered::Ok) => report.delivered += 1,
                Ok(Delivered::Gone) => gone.push(channel),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if !gone.is_empty() {
            let (pruned, prune_error) = self.prune(topic, gone).await?;
            report.pruned = pruned;
            if first_error.is_none() {
                first_error = prune_error;
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn deliver(&self, topic: Topic, channel: &ChannelId, payload: &str) -> Result<Delivered> {
        match self.transport.deliver(channel, payload).await {
            Ok(()) => Ok(Delivered::Ok),
            Err(e) if e.is_gone() => Ok(Delivered::Gone),
            Err(e) => {
                warn!(%topic, %channel, error = %e, "delivery failed");
                Err(BlogError::Delivery {
                    channel: channel.clone(),
                    source: e,
                })
            }
        }
    }

    /// Deregister stale channels on the blocking pool, since each removal
    /// writes the registry journal. Every removal is attempted; the ones that
    /// succeeded are returned with the first failure.
    async fn prune(
        &self,
        topic: Topic,
        gone: Vec<ChannelId>,
    ) -> Result<(Vec<ChannelId>, Option<BlogError>)> {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || {
            let mut pruned = Vec::with_capacity(gone.len());
            let mut first_error = None;
            for channel in gone {
                match registry.deregister(topic, &channel) {
                    Ok(()) => {
                        info!(%topic, %channel, "found stale channel, deleted");
                        pruned.push(channel);
                    }
                    Err(e) => {
                        warn!(%topic, %channel, error = %e, "failed to delete stale channel");
                        first_error.get_or_insert(e);
                    }
                }
            }
            (pruned, first_error)
        })
        .await
        .map_err(|e| BlogError::Io(io::Error::other(e)))
    }
}
