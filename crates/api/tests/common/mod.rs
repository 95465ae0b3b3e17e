#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use pointsub_core::error::CoreError;
use pointsub_core::eventsub::normalize::{FollowEvent, UserRef};
use pointsub_core::eventsub::NormalizedEvent;
use pointsub_core::types::DbId;
use sha2::Sha256;

use pointsub_api::auth::AuthResolver;
use pointsub_api::config::ServerConfig;
use pointsub_api::router::build_app_router;
use pointsub_api::state::AppState;

pub const TEST_SECRET: &str = "test-eventsub-secret";

/// In-memory token store.
pub struct StubAuthResolver {
    tokens: HashMap<String, DbId>,
}

impl StubAuthResolver {
    pub fn new(tokens: &[(&str, DbId)]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|(token, id)| (token.to_string(), *id))
                .collect(),
        }
    }
}

#[async_trait]
impl AuthResolver for StubAuthResolver {
    async fn get_id_from_token(&self, token: &str) -> Result<Option<DbId>, CoreError> {
        Ok(self.tokens.get(token).copied())
    }
}

/// Token store whose lookups always fail.
pub struct FailingAuthResolver;

#[async_trait]
impl AuthResolver for FailingAuthResolver {
    async fn get_id_from_token(&self, _token: &str) -> Result<Option<DbId>, CoreError> {
        Err(CoreError::Internal("connection refused".into()))
    }

    async fn is_healthy(&self) -> bool {
        false
    }
}

/// Build a test `ServerConfig` with safe defaults and liveness disabled.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        ping_interval: None,
        eventsub_secret: TEST_SECRET.to_string(),
    }
}

/// State with tokens `token-a` -> 10 and `token-b` -> 20.
pub fn test_state() -> AppState {
    AppState::new(
        test_config(),
        Arc::new(StubAuthResolver::new(&[("token-a", 10), ("token-b", 20)])),
    )
}

/// Build the full application router, the same one production serves.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state)
}

/// Compute the `sha256=<hex>` signature header for a webhook delivery.
pub fn sign(secret: &str, message_id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Build a correctly signed webhook request.
pub fn webhook_request(message_type: &str, body: &serde_json::Value) -> Request<Body> {
    let body = serde_json::to_vec(body).unwrap();
    let message_id = "msg-1";
    let timestamp = "2024-01-01T00:00:00Z";
    let signature = sign(TEST_SECRET, message_id, timestamp, &body);

    Request::builder()
        .method("POST")
        .uri("/eventsub")
        .header("content-type", "application/json")
        .header("twitch-eventsub-message-type", message_type)
        .header("twitch-eventsub-message-id", message_id)
        .header("twitch-eventsub-message-timestamp", timestamp)
        .header("twitch-eventsub-message-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

/// A notification body wrapping `event` under `subscription_type`.
pub fn notification(subscription_type: &str, event: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "subscription": {
            "id": "f1c2a387-161a-49f9-a165-0f21d7a4e1c4",
            "type": subscription_type,
            "version": "1",
            "status": "enabled"
        },
        "event": event
    })
}

/// A `channel.follow` event where `broadcaster_id` is followed by user 99.
pub fn follow_event_json(broadcaster_id: DbId) -> serde_json::Value {
    serde_json::json!({
        "user_id": "99",
        "user_login": "viewer",
        "user_name": "Viewer",
        "broadcaster_user_id": broadcaster_id.to_string(),
        "broadcaster_user_login": "streamer",
        "broadcaster_user_name": "Streamer",
        "followed_at": "2024-01-01T00:00:00Z"
    })
}

/// A normalized follow event for `broadcaster_id`.
pub fn follow_event(broadcaster_id: DbId) -> NormalizedEvent {
    NormalizedEvent::Follow(FollowEvent {
        user: UserRef {
            id: 99,
            login: "viewer".into(),
            display_name: "Viewer".into(),
        },
        broadcaster: UserRef {
            id: broadcaster_id,
            login: "streamer".into(),
            display_name: "Streamer".into(),
        },
        followed_at: 1_704_067_200_000,
    })
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
