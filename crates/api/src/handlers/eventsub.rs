//! EventSub webhook receiver.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use pointsub_core::error::CoreError;
use pointsub_core::eventsub::raw::Notification;
use pointsub_core::eventsub::{
    normalize, Normalized, HEADER_MESSAGE_ID, HEADER_MESSAGE_SIGNATURE, HEADER_MESSAGE_TIMESTAMP,
    HEADER_MESSAGE_TYPE, MESSAGE_TYPE_NOTIFICATION,
};
use pointsub_core::signature;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /eventsub
///
/// Verify, normalize and fan out one webhook notification.
///
/// - `403` when the signature does not verify or the message type is not
///   `notification`.
/// - `400` when a verified body is not a notification envelope.
/// - `204` otherwise, including unrecognized subscription types and events
///   that fail normalization, so the sender does not redeliver them.
pub async fn receive_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let verified = signature::verify(
        state.config.eventsub_secret.as_bytes(),
        header(&headers, HEADER_MESSAGE_ID),
        header(&headers, HEADER_MESSAGE_TIMESTAMP),
        &body,
        header(&headers, HEADER_MESSAGE_SIGNATURE).unwrap_or_default(),
    );
    if !verified {
        tracing::warn!("Received invalid eventsub signature");
        return Err(CoreError::InvalidSignature.into());
    }

    let message_type = header(&headers, HEADER_MESSAGE_TYPE).unwrap_or_default();
    if message_type != MESSAGE_TYPE_NOTIFICATION {
        tracing::warn!(message_type, "Refusing non-notification eventsub message");
        return Err(CoreError::UnsupportedMessageType(message_type.to_string()).into());
    }

    let notification: Notification = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid notification body: {e}")))?;
    let subscription_type = notification.subscription.kind;
    tracing::info!(subscription_type = %subscription_type, "Received eventsub notification");

    match normalize(&subscription_type, notification.event) {
        Ok(Normalized::Event(event)) => {
            let recipients = state.messages.deliver(&event).await;
            tracing::info!(
                kind = event.kind(),
                broadcaster_user_id = event.broadcaster_user_id(),
                recipients,
                "Relayed eventsub notification"
            );
        }
        Ok(Normalized::Unrecognized(ty)) => {
            tracing::warn!(subscription_type = %ty, "Unhandled event type");
        }
        Err(e) => {
            tracing::warn!(
                subscription_type = %subscription_type,
                error = %e,
                "Dropping malformed eventsub event"
            );
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Read a header as UTF-8, treating non-UTF-8 values as missing.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
