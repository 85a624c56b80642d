//! One live WebSocket session: attach, pump, detach.

use super::hub::ChannelHub;
use super::lifecycle::ChannelLifecycle;
use crate::types::Topic;
use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drive a subscriber socket until either side closes it.
///
/// The channel is attached to the hub before it is registered so that a
/// broadcast racing the connect never sees a registered but unknown channel.
pub(crate) async fn run(
    socket: WebSocket,
    topic: Topic,
    hub: Arc<ChannelHub>,
    lifecycle: ChannelLifecycle,
) {
    let (channel, mut outbound) = hub.attach();
    let (mut sender, mut receiver) = socket.split();

    if lifecycle.on_open(topic, &channel).is_err() {
        hub.detach(&channel);
        let frame = CloseFrame {
            code: close_code::ERROR,
            reason: Utf8Bytes::from_static("failed to connect"),
        };
        let _ = sender.send(Message::Close(Some(frame))).await;
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_channel = channel.clone();
    let mut recv_task = tokio::spawn(async move {
        // Subscribers only listen; anything they send besides close is ignored
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(channel = %recv_channel, error = %e, "socket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.detach(&channel);
    if let Err(e) = lifecycle.on_close(topic, &channel) {
        // The entry is pruned by the next broadcast that finds it gone
        warn!(%topic, %channel, error = %e, "leaving stale registry entry");
    }
}
