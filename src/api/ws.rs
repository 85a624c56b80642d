//! WebSocket endpoints, one per topic.

use super::AppState;
use crate::types::Topic;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;

pub(super) async fn posts(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    upgrade(ws, state, Topic::Posts)
}

pub(super) async fn questions(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    upgrade(ws, state, Topic::Questions)
}

fn upgrade(ws: WebSocketUpgrade, state: AppState, topic: Topic) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.channels.serve(socket, topic).await })
}
