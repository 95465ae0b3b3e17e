use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with the
/// [`ConnectionRegistry`](crate::ws::ConnectionRegistry) and served by two
/// spawned tasks (sender + receiver).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, remote_addr, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection and starts its liveness monitor.
///   2. Spawns a sender task that forwards messages from the registry channel.
///   3. Spawns a receiver task that feeds client frames to the message router.
///   4. When either side finishes, stops the other and removes the connection
///      (which also cancels the liveness monitor).
async fn handle_socket(socket: WebSocket, remote_addr: SocketAddr, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, %remote_addr, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = state.registry.add(conn_id.clone(), Some(remote_addr)).await;
    state.liveness.watch(&conn_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink. A Close
    // frame is the last thing sent.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Receiver task: process inbound messages.
    let receiver_conn_id = conn_id.clone();
    let messages = state.messages.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    messages.reply(&receiver_conn_id, text.as_str()).await;
                }
                Ok(Message::Binary(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes);
                    messages.reply(&receiver_conn_id, &text).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %receiver_conn_id, "Control frame received");
                }
                Err(e) => {
                    tracing::debug!(conn_id = %receiver_conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Clean up: no-op if the liveness monitor already evicted it.
    state.registry.remove(&conn_id).await;
    tracing::info!(conn_id = %conn_id, %remote_addr, "WebSocket disconnected");
}
