//! Registry bookkeeping for channel open and close events.

use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::types::{ChannelId, Topic};
use std::sync::Arc;
use tracing::{error, info};

/// Records channels in the registry as they open and close.
///
/// A failure is returned to the transport for that one channel and touches
/// nothing else.
#[derive(Clone)]
pub struct ChannelLifecycle {
    registry: Arc<dyn SubscriberRegistry>,
}

impl ChannelLifecycle {
    pub fn new(registry: Arc<dyn SubscriberRegistry>) -> Self {
        Self { registry }
    }

    pub fn on_open(&self, topic: Topic, channel: &ChannelId) -> Result<()> {
        match self.registry.register(topic, channel) {
            Ok(()) => {
                info!(%topic, %channel, "channel connected");
                Ok(())
            }
            Err(e) => {
                error!(%topic, %channel, error = %e, "failed to connect channel");
                Err(e)
            }
        }
    }

    pub fn on_close(&self, topic: Topic, channel: &ChannelId) -> Result<()> {
        match self.registry.deregister(topic, channel) {
            Ok(()) => {
                info!(%topic, %channel, "channel disconnected");
                Ok(())
            }
            Err(e) => {
                error!(%topic, %channel, error = %e, "failed to disconnect channel");
                Err(e)
            }
        }
    }
}
