//! Live push channels.
//!
//! Browsers hold one WebSocket per topic. Each socket becomes a channel: an
//! outbound queue in the [`ChannelHub`] plus an entry in the subscriber
//! registry. The hub doubles as the broadcast [`Transport`](crate::broadcast::Transport).

mod hub;
mod lifecycle;
mod session;

pub use hub::{ChannelHub, HubConfig};
pub use lifecycle::ChannelLifecycle;

use crate::registry::SubscriberRegistry;
use crate::types::Topic;
use axum::extract::ws::WebSocket;
use std::sync::Arc;

/// Hub and lifecycle handler shared by every WebSocket session.
#[derive(Clone)]
pub struct PushChannels {
    hub: Arc<ChannelHub>,
    lifecycle: ChannelLifecycle,
}

impl PushChannels {
    pub fn new(registry: Arc<dyn SubscriberRegistry>, config: HubConfig) -> Self {
        Self {
            hub: Arc::new(ChannelHub::new(config)),
            lifecycle: ChannelLifecycle::new(registry),
        }
    }

    pub fn hub(&self) -> &Arc<ChannelHub> {
        &self.hub
    }

    pub fn lifecycle(&self) -> &ChannelLifecycle {
        &self.lifecycle
    }

    /// Serve an upgraded socket subscribed to `topic` until it closes.
    pub async fn serve(&self, socket: WebSocket, topic: Topic) {
        session::run(socket, topic, self.hub.clone(), self.lifecycle.clone()).await
    }
}
