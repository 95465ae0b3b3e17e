//! Client protocol handling and event fan-out.

use std::sync::Arc;

use axum::extract::ws::Message;
use pointsub_core::eventsub::NormalizedEvent;
use pointsub_core::protocol::{ErrorKind, InboundBody, InboundMessage, Nonce, OutboundMessage};
use pointsub_core::types::DbId;

use crate::auth::AuthResolver;
use crate::ws::manager::ConnectionRegistry;

/// Dispatches inbound client frames and outbound events.
///
/// Inbound: `PING` refreshes liveness and is answered with `PONG`;
/// `AUTHENTICATION` resolves the token and marks the connection as owned by
/// the resolved user. Nothing a client sends closes its connection.
///
/// Outbound: events go to every connection authenticated as the event's
/// broadcaster. Delivery is fire-and-forget; users without a live connection
/// simply miss the event.
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    auth: Arc<dyn AuthResolver>,
}

impl MessageRouter {
    pub fn new(registry: Arc<ConnectionRegistry>, auth: Arc<dyn AuthResolver>) -> Self {
        Self { registry, auth }
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Handle one client text frame and queue the reply on its connection.
    pub async fn reply(&self, conn_id: &str, text: &str) {
        let response = self.handle_text(conn_id, text).await;
        self.registry.send_json(conn_id, &response).await;
    }

    /// Handle one client text frame and return the reply.
    ///
    /// Raw frames are never logged since `AUTHENTICATION` carries the
    /// client's API token.
    pub async fn handle_text(&self, conn_id: &str, text: &str) -> OutboundMessage {
        match InboundMessage::parse(text) {
            Ok(message) => {
                tracing::debug!(
                    conn_id,
                    kind = message.body.kind(),
                    nonce = ?message.nonce,
                    "Received message"
                );
                self.handle(conn_id, message).await
            }
            Err(err) => {
                tracing::warn!(conn_id, error = %err, "Received invalid message");
                err.into()
            }
        }
    }

    /// Handle one parsed client message and return the reply.
    pub async fn handle(&self, conn_id: &str, message: InboundMessage) -> OutboundMessage {
        match message.body {
            InboundBody::Ping => {
                self.registry.touch(conn_id).await;
                OutboundMessage::pong(message.nonce)
            }
            InboundBody::Authenticate { token } => {
                self.authenticate(conn_id, message.nonce, token).await
            }
        }
    }

    async fn authenticate(
        &self,
        conn_id: &str,
        nonce: Option<Nonce>,
        token: Option<String>,
    ) -> OutboundMessage {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return OutboundMessage::error(nonce, ErrorKind::InvalidMessage, "Missing token");
        };

        match self.auth.get_id_from_token(&token).await {
            Ok(Some(user_id)) => {
                // The lookup may have outlived the connection.
                if self.registry.authenticate(conn_id, user_id, token).await {
                    tracing::info!(conn_id, user_id, "Connection authenticated");
                } else {
                    tracing::debug!(conn_id, user_id, "Connection closed during authentication");
                }
                OutboundMessage::ok(nonce, "Authenticated")
            }
            Ok(None) => {
                tracing::warn!(conn_id, "Authentication with unknown token");
                OutboundMessage::error(nonce, ErrorKind::InvalidToken, "Invalid token")
            }
            Err(e) => {
                tracing::error!(conn_id, error = %e, "Token lookup failed");
                OutboundMessage::error(nonce, ErrorKind::InvalidToken, "Invalid token")
            }
        }
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Deliver an event to its broadcaster's connections.
    pub async fn deliver(&self, event: &NormalizedEvent) -> usize {
        self.deliver_to(event.broadcaster_user_id(), event).await
    }

    /// Deliver an event to every connection authenticated as `user_id`.
    ///
    /// Returns the number of connections the frame was queued for.
    pub async fn deliver_to(&self, user_id: DbId, event: &NormalizedEvent) -> usize {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to serialize event");
                return 0;
            }
        };

        let count = self
            .registry
            .send_to_user(user_id, Message::Text(text.into()))
            .await;
        tracing::debug!(user_id, kind = event.kind(), recipients = count, "Event delivered");
        count
    }
}
