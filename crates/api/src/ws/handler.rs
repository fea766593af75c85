use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use linewatch_core::topics::FeedTopic;

use crate::error::AppError;
use crate::state::AppState;

/// HTTP handler that upgrades `/ws/{topic}` to a WebSocket feed
/// subscription.
///
/// Unknown topics are rejected before the upgrade.
pub async fn feed_handler(
    ws: WebSocketUpgrade,
    Path(topic): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let topic = FeedTopic::parse(&topic)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown feed topic '{topic}'")))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, topic, state)))
}

/// Manage a single feed subscription after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the subscription with `FeedManager` and makes sure the
///      topic's snapshot broadcaster is running.
///   2. Spawns a sender task that forwards frames from the feed channel.
///   3. Drains inbound messages on the current task (feeds are one-way;
///      only Close and Pong matter).
///   4. Cleans up on disconnect, stopping the broadcaster when the last
///      subscriber leaves.
///
/// The feed channel closing means the manager evicted this subscriber
/// (stalled queue or shutdown). That ends the connection from our side:
/// the sender task pushes a Close frame and the receive loop exits, so
/// the cleanup below runs instead of waiting for the client to hang up.
async fn handle_socket(socket: WebSocket, topic: FeedTopic, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, topic = %topic, "Feed subscriber connected");

    let mut rx = state.feeds.subscribe(topic, conn_id.clone()).await;
    state.broadcasters.ensure_running(topic, &state).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel frames to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Feed sink closed");
                return;
            }
        }
        tracing::debug!(conn_id = %sender_conn_id, "Feed channel closed, disconnecting");
        let _ = sink.send(Message::Close(None)).await;
    });

    // Receiver loop: feeds are push-only, so watch for disconnect, and
    // bail out as soon as the sender task ends.
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            next = stream.next() => match next {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Feed receive error");
                    break;
                }
            }
        }
    }

    state.feeds.unsubscribe(topic, &conn_id).await;
    send_task.abort();
    state.broadcasters.stop_if_empty(topic, &state.feeds).await;
    tracing::info!(conn_id = %conn_id, topic = %topic, "Feed subscriber disconnected");
}
