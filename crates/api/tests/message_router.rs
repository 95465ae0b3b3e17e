//! Tests for `MessageRouter`: the client protocol and event fan-out.

mod common;

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::ws::Message;
use pointsub_api::auth::AuthResolver;
use pointsub_api::ws::{AuthState, ConnectionRegistry, MessageRouter};
use pointsub_core::error::CoreError;
use pointsub_core::protocol::{ErrorKind, OutboundMessage};
use pointsub_core::types::DbId;
use serde_json::json;
use tokio::sync::Notify;

use common::{follow_event, FailingAuthResolver, StubAuthResolver};

fn router_with(auth: Arc<dyn AuthResolver>) -> (Arc<ConnectionRegistry>, MessageRouter) {
    let registry = Arc::new(ConnectionRegistry::new());
    let router = MessageRouter::new(Arc::clone(&registry), auth);
    (registry, router)
}

fn stub_router() -> (Arc<ConnectionRegistry>, MessageRouter) {
    router_with(Arc::new(StubAuthResolver::new(&[("good", 42), ("other", 7)])))
}

// ---------------------------------------------------------------------------
// Test: PING is answered with PONG regardless of auth state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_returns_pong_with_nonce() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    let reply = router
        .handle_text("c", r#"{"type":"PING","nonce":"abc"}"#)
        .await;
    assert_eq!(reply, OutboundMessage::pong(Some("abc".into())));

    router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"good"}"#)
        .await;
    let reply = router.handle_text("c", r#"{"type":"ping"}"#).await;
    assert_eq!(reply, OutboundMessage::pong(None));
}

// ---------------------------------------------------------------------------
// Test: reply() queues the response as a JSON text frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reply_queues_json_frame() {
    let (registry, router) = stub_router();
    let mut rx = registry.add("c".to_string(), None).await;

    router.reply("c", r#"{"type":"PING","nonce":"n1"}"#).await;

    match rx.recv().await.expect("reply should be queued") {
        Message::Text(text) => {
            let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(json, json!({ "type": "PONG", "nonce": "n1" }));
        }
        other => panic!("Expected text frame, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: a valid token authenticates the connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_token_authenticates() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    let reply = router
        .handle_text("c", r#"{"type":"AUTHENTICATION","nonce":"x","token":"good"}"#)
        .await;

    assert_eq!(reply, OutboundMessage::ok(Some("x".into()), "Authenticated"));
    assert_eq!(
        registry.get("c").await.unwrap().auth,
        AuthState::Authenticated {
            user_id: 42,
            token: "good".into()
        }
    );
}

// ---------------------------------------------------------------------------
// Test: a missing or empty token is an invalid message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_invalid_message() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    for frame in [
        r#"{"type":"AUTHENTICATION","nonce":"m"}"#,
        r#"{"type":"AUTHENTICATION","nonce":"m","token":""}"#,
    ] {
        let reply = router.handle_text("c", frame).await;
        assert_eq!(
            reply,
            OutboundMessage::error(Some("m".into()), ErrorKind::InvalidMessage, "Missing token")
        );
    }
    assert_eq!(registry.get("c").await.unwrap().auth, AuthState::Unauthenticated);
}

// ---------------------------------------------------------------------------
// Test: an unknown token is rejected and leaves the connection open
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_token_is_invalid_token() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    let reply = router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"nope"}"#)
        .await;

    assert_eq!(
        reply,
        OutboundMessage::error(None, ErrorKind::InvalidToken, "Invalid token")
    );
    let info = registry.get("c").await.expect("connection stays open");
    assert_eq!(info.auth, AuthState::Unauthenticated);
}

// ---------------------------------------------------------------------------
// Test: a failing token store answers INVALID_TOKEN
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_failure_is_invalid_token() {
    let (registry, router) = router_with(Arc::new(FailingAuthResolver));
    let _rx = registry.add("c".to_string(), None).await;

    let reply = router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"good"}"#)
        .await;

    assert_eq!(
        reply,
        OutboundMessage::error(None, ErrorKind::InvalidToken, "Invalid token")
    );
}

// ---------------------------------------------------------------------------
// Test: authentication never reverts, later valid tokens rebind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn authentication_is_one_way() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"good"}"#)
        .await;
    router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"nope"}"#)
        .await;
    assert_eq!(registry.get("c").await.unwrap().auth.user_id(), Some(42));

    router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"other"}"#)
        .await;
    assert_eq!(registry.get("c").await.unwrap().auth.user_id(), Some(7));
}

// ---------------------------------------------------------------------------
// Test: non-string nonces are echoed back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn numeric_nonce_is_echoed() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    let reply = router.handle_text("c", r#"{"type":"PING","nonce":123}"#).await;
    assert_eq!(reply, OutboundMessage::pong(Some(json!(123))));

    let reply = router
        .handle_text("c", r#"{"type":"AUTHENTICATION","nonce":[1,"a"]}"#)
        .await;
    assert_eq!(
        serde_json::to_value(reply).unwrap(),
        json!({
            "type": "RESPONSE",
            "nonce": [1, "a"],
            "error": "INVALID_MESSAGE",
            "message": "Missing token"
        })
    );
}

// ---------------------------------------------------------------------------
// Test: unknown types and malformed frames are answered, not fatal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_frames_get_invalid_message() {
    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    let reply = router
        .handle_text("c", r#"{"type":"LISTEN","nonce":"q"}"#)
        .await;
    assert!(matches!(
        reply,
        OutboundMessage::Response {
            nonce: Some(ref n),
            error: Some(ErrorKind::InvalidMessage),
            ..
        } if *n == json!("q")
    ));

    let reply = router.handle_text("c", "{not json").await;
    assert!(matches!(
        reply,
        OutboundMessage::Response {
            nonce: None,
            error: Some(ErrorKind::InvalidMessage),
            ..
        }
    ));

    assert!(registry.get("c").await.is_some());
}

// ---------------------------------------------------------------------------
// Test: tokens never reach the logs
// ---------------------------------------------------------------------------

/// In-memory log sink for a `fmt` subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn authentication_token_is_not_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();
    // Current-thread runtime: everything below runs on this thread.
    let _guard = tracing::subscriber::set_default(subscriber);

    let (registry, router) = stub_router();
    let _rx = registry.add("c".to_string(), None).await;

    router
        .reply("c", r#"{"type":"AUTHENTICATION","nonce":"n","token":"good"}"#)
        .await;
    router
        .reply("c", r#"{"type":"AUTHENTICATION","token":"wrong-token-123"}"#)
        .await;
    router
        .reply("c", r#"{"type":"AUTHENTICATION","token":"broken-token-456""#)
        .await;

    let output = logs.contents();
    assert!(output.contains("AUTHENTICATION"), "expected message logs: {output}");
    assert!(!output.contains("\"good\""));
    assert!(!output.contains("wrong-token-123"));
    assert!(!output.contains("broken-token-456"));
}

// ---------------------------------------------------------------------------
// Test: a connection that closes mid-lookup is not resurrected
// ---------------------------------------------------------------------------

struct GatedAuthResolver {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl AuthResolver for GatedAuthResolver {
    async fn get_id_from_token(&self, _token: &str) -> Result<Option<DbId>, CoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Some(42))
    }
}

#[tokio::test]
async fn closed_connection_is_not_authenticated() {
    let auth = Arc::new(GatedAuthResolver {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let (registry, router) = router_with(auth.clone());
    let router = Arc::new(router);
    let _rx = registry.add("c".to_string(), None).await;

    let task = tokio::spawn({
        let router = Arc::clone(&router);
        async move {
            router
                .handle_text("c", r#"{"type":"AUTHENTICATION","token":"good"}"#)
                .await
        }
    });

    auth.entered.notified().await;
    registry.remove("c").await;
    auth.release.notify_one();
    task.await.unwrap();

    assert!(registry.get("c").await.is_none());
    assert_eq!(registry.connection_count().await, 0);
    assert_eq!(router.deliver(&follow_event(42)).await, 0);
}

// ---------------------------------------------------------------------------
// Test: deliver() targets only the broadcaster's connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deliver_targets_broadcaster() {
    let (registry, router) = stub_router();
    let mut rx_owner = registry.add("owner".to_string(), None).await;
    let mut rx_other = registry.add("other".to_string(), None).await;
    let mut rx_anon = registry.add("anon".to_string(), None).await;

    router
        .handle_text("owner", r#"{"type":"AUTHENTICATION","token":"good"}"#)
        .await;
    router
        .handle_text("other", r#"{"type":"AUTHENTICATION","token":"other"}"#)
        .await;

    assert_eq!(router.deliver(&follow_event(42)).await, 1);

    match rx_owner.recv().await.expect("owner should receive event") {
        Message::Text(text) => {
            let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(json["type"], "FOLLOW");
            assert_eq!(json["event"]["broadcaster"]["id"], 42);
            assert_eq!(json["event"]["followedAt"], 1_704_067_200_000_i64);
        }
        other => panic!("Expected text frame, got: {other:?}"),
    }
    assert!(rx_other.try_recv().is_err());
    assert!(rx_anon.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: duplicate deliveries are not deduplicated
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_events_are_delivered_twice() {
    let (registry, router) = stub_router();
    let mut rx = registry.add("c".to_string(), None).await;
    router
        .handle_text("c", r#"{"type":"AUTHENTICATION","token":"good"}"#)
        .await;

    let event = follow_event(42);
    router.deliver(&event).await;
    router.deliver(&event).await;

    assert!(matches!(rx.recv().await, Some(Message::Text(_))));
    assert!(matches!(rx.recv().await, Some(Message::Text(_))));
}

// ---------------------------------------------------------------------------
// Test: deliver_to() with nobody connected is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deliver_without_recipients_returns_zero() {
    let (_registry, router) = stub_router();

    assert_eq!(router.deliver_to(1234, &follow_event(1234)).await, 0);
}
