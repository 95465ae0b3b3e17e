use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message};
use pointsub_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Authentication state of a connection.
///
/// Moves from `Unauthenticated` to `Authenticated` only; there is no way
/// back short of closing the connection.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { user_id: DbId, token: String },
}

impl AuthState {
    pub fn user_id(&self) -> Option<DbId> {
        match self {
            AuthState::Unauthenticated => None,
            AuthState::Authenticated { user_id, .. } => Some(*user_id),
        }
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => f.write_str("Unauthenticated"),
            AuthState::Authenticated { user_id, .. } => f
                .debug_struct("Authenticated")
                .field("user_id", user_id)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Metadata for a single WebSocket connection.
struct WsConnection {
    remote_addr: Option<SocketAddr>,
    /// Channel sender for outbound messages to this connection.
    sender: WsSender,
    connected_at: Timestamp,
    /// Last protocol `PING` (or the accept time).
    last_liveness: Instant,
    auth: AuthState,
    /// Liveness monitor bound to this connection, cancelled on removal.
    liveness_task: Option<JoinHandle<()>>,
}

impl WsConnection {
    fn info(&self, conn_id: &str) -> ConnectionInfo {
        ConnectionInfo {
            conn_id: conn_id.to_string(),
            remote_addr: self.remote_addr,
            connected_at: self.connected_at,
            last_liveness: self.last_liveness,
            auth: self.auth.clone(),
        }
    }

    fn cancel_liveness_task(&mut self) {
        if let Some(handle) = self.liveness_task.take() {
            handle.abort();
        }
    }
}

/// Result of a liveness check made by
/// [`ConnectionRegistry::evict_if_silent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceCheck {
    /// The connection is no longer registered.
    Gone,
    /// Liveness was recorded within the interval.
    Active { silent_for: Duration },
    /// The connection was removed and sent a normal-closure frame.
    Evicted {
        silent_for: Duration,
        remote_addr: Option<SocketAddr>,
    },
}

fn normal_close(reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: reason.to_string().into(),
    }))
}

/// Read-only snapshot of a connection's state.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub conn_id: String,
    pub remote_addr: Option<SocketAddr>,
    pub connected_at: Timestamp,
    pub last_liveness: Instant,
    pub auth: AuthState,
}

/// Registry of all live WebSocket connections.
///
/// The single owner of connection state. Thread-safe via interior `RwLock`;
/// designed to be wrapped in `Arc` and shared across the application.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new, unauthenticated connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. Re-using an id replaces the
    /// previous entry and cancels its liveness monitor.
    pub async fn add(
        &self,
        conn_id: String,
        remote_addr: Option<SocketAddr>,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            remote_addr,
            sender: tx,
            connected_at: chrono::Utc::now(),
            last_liveness: Instant::now(),
            auth: AuthState::Unauthenticated,
            liveness_task: None,
        };
        if let Some(mut previous) = self.connections.write().await.insert(conn_id, conn) {
            previous.cancel_liveness_task();
        }
        rx
    }

    /// Remove a connection and cancel its liveness monitor.
    ///
    /// Removing an unknown id is a no-op. Returns whether an entry was removed.
    pub async fn remove(&self, conn_id: &str) -> bool {
        match self.connections.write().await.remove(conn_id) {
            Some(mut conn) => {
                conn.cancel_liveness_task();
                true
            }
            None => false,
        }
    }

    /// Evict a connection if it has been silent for longer than `interval`.
    ///
    /// The silence check and the removal happen under one write lock, so a
    /// `touch` can never land between them. On eviction a normal-closure
    /// frame carrying `reason` is queued and the monitor handle is detached
    /// rather than aborted, since the caller is that monitor.
    pub async fn evict_if_silent(
        &self,
        conn_id: &str,
        interval: Duration,
        reason: &str,
    ) -> SilenceCheck {
        let mut conns = self.connections.write().await;

        let Some(conn) = conns.get(conn_id) else {
            return SilenceCheck::Gone;
        };
        let silent_for = conn.last_liveness.elapsed();
        if silent_for <= interval {
            return SilenceCheck::Active { silent_for };
        }

        let Some(mut conn) = conns.remove(conn_id) else {
            return SilenceCheck::Gone;
        };
        drop(conn.liveness_task.take());
        let _ = conn.sender.send(normal_close(reason));
        SilenceCheck::Evicted {
            silent_for,
            remote_addr: conn.remote_addr,
        }
    }

    /// Snapshot of a connection's state.
    pub async fn get(&self, conn_id: &str) -> Option<ConnectionInfo> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .map(|conn| conn.info(conn_id))
    }

    /// Bind a liveness monitor to a connection.
    ///
    /// If the connection is already gone the task is aborted immediately and
    /// `false` is returned.
    pub async fn attach_liveness_task(&self, conn_id: &str, handle: JoinHandle<()>) -> bool {
        let mut conns = self.connections.write().await;
        match conns.get_mut(conn_id) {
            Some(conn) => {
                conn.cancel_liveness_task();
                conn.liveness_task = Some(handle);
                true
            }
            None => {
                handle.abort();
                false
            }
        }
    }

    /// Record liveness evidence for a connection.
    pub async fn touch(&self, conn_id: &str) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.last_liveness = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Mark a connection as authenticated.
    ///
    /// Membership is checked under the write lock, so a connection that closed
    /// while its token lookup was in flight is left alone and `false` is
    /// returned.
    pub async fn authenticate(&self, conn_id: &str, user_id: DbId, token: String) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.auth = AuthState::Authenticated { user_id, token };
                true
            }
            None => false,
        }
    }

    /// Queue a message for a single connection.
    pub async fn send(&self, conn_id: &str, message: Message) -> bool {
        match self.connections.read().await.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Serialize `value` as a JSON text frame and queue it for a connection.
    pub async fn send_json<T: Serialize>(&self, conn_id: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.send(conn_id, Message::Text(text.into())).await,
            Err(e) => {
                tracing::error!(conn_id, error = %e, "Failed to serialize outbound message");
                false
            }
        }
    }

    /// Call `f` for every connection authenticated as `user_id`.
    ///
    /// Iterates over a snapshot taken under the read lock, so `f` runs
    /// without holding the lock and the registry may change meanwhile.
    pub async fn for_each_matching<F>(&self, user_id: DbId, mut f: F)
    where
        F: FnMut(&str, &WsSender),
    {
        let matching: Vec<(String, WsSender)> = self
            .connections
            .read()
            .await
            .iter()
            .filter(|(_, conn)| conn.auth.user_id() == Some(user_id))
            .map(|(id, conn)| (id.clone(), conn.sender.clone()))
            .collect();

        for (conn_id, sender) in &matching {
            f(conn_id, sender);
        }
    }

    /// Send a message to all connections authenticated as a specific user.
    ///
    /// Returns the number of connections the message was queued for.
    /// Connections whose send channels are closed are skipped.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let mut count = 0;
        self.for_each_matching(user_id, |_, sender| {
            if sender.send(message.clone()).is_ok() {
                count += 1;
            }
        })
        .await;
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a normal-closure frame to every connection, cancel every liveness
    /// monitor, then clear the map.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values_mut() {
            conn.cancel_liveness_task();
            let _ = conn.sender.send(normal_close("Server shutting down"));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
