//! Socket protocol messages exchanged with relay clients.
//!
//! Clients send `PING` and `AUTHENTICATION` frames; the relay answers with
//! `PONG` and `RESPONSE` frames and pushes events as
//! [`NormalizedEvent`](crate::eventsub::NormalizedEvent) frames.

use serde::Serialize;
use serde_json::Value;

/// Client-chosen correlation value, echoed back verbatim in the reply.
///
/// Any JSON value is accepted; `null` is treated as absent.
pub type Nonce = Value;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A parsed client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub nonce: Option<Nonce>,
    pub body: InboundBody,
}

/// The type-specific part of a client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundBody {
    Ping,
    /// `token` is kept optional so a missing token can be answered with a
    /// protocol response instead of a parse failure.
    Authenticate { token: Option<String> },
}

impl InboundBody {
    /// The wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundBody::Ping => "PING",
            InboundBody::Authenticate { .. } => "AUTHENTICATION",
        }
    }
}

/// A client frame that could not be understood.
///
/// Carries the nonce when it could still be recovered so the error response
/// can be correlated by the client. The message never quotes field values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProtocolError {
    pub nonce: Option<Nonce>,
    pub message: String,
}

impl ProtocolError {
    fn new(nonce: Option<Nonce>, message: impl Into<String>) -> Self {
        Self {
            nonce,
            message: message.into(),
        }
    }
}

impl InboundMessage {
    /// Parse a text frame. The `type` field is matched case-insensitively.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::new(None, format!("Invalid message: {e}")))?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::new(None, "Invalid message: expected a JSON object"));
        };

        let nonce = fields.remove("nonce").filter(|nonce| !nonce.is_null());

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(_) => return Err(ProtocolError::new(nonce, "Message type must be a string")),
            None => return Err(ProtocolError::new(nonce, "Missing message type")),
        };

        let body = match kind.to_ascii_uppercase().as_str() {
            "PING" => InboundBody::Ping,
            "AUTHENTICATION" => {
                let token = match fields.remove("token") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(token)) => Some(token),
                    Some(_) => return Err(ProtocolError::new(nonce, "Token must be a string")),
                };
                InboundBody::Authenticate { token }
            }
            _ => {
                return Err(ProtocolError::new(
                    nonce,
                    format!("Unknown message type: {kind}"),
                ))
            }
        };

        Ok(Self { nonce, body })
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Enumerated error kinds carried in `RESPONSE` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidMessage,
    InvalidToken,
}

/// A protocol reply frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        nonce: Option<Nonce>,
    },
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        nonce: Option<Nonce>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorKind>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl OutboundMessage {
    pub fn pong(nonce: Option<Nonce>) -> Self {
        Self::Pong { nonce }
    }

    /// A successful `RESPONSE` with a human-readable message.
    pub fn ok(nonce: Option<Nonce>, message: impl Into<String>) -> Self {
        Self::Response {
            nonce,
            error: None,
            message: Some(message.into()),
        }
    }

    /// A failed `RESPONSE`.
    pub fn error(nonce: Option<Nonce>, error: ErrorKind, message: impl Into<String>) -> Self {
        Self::Response {
            nonce,
            error: Some(error),
            message: Some(message.into()),
        }
    }
}

impl From<ProtocolError> for OutboundMessage {
    fn from(err: ProtocolError) -> Self {
        Self::error(err.nonce, ErrorKind::InvalidMessage, err.message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_ping_with_nonce() {
        let msg = InboundMessage::parse(r#"{"type":"PING","nonce":"abc"}"#).unwrap();
        assert_eq!(msg.nonce, Some(json!("abc")));
        assert_eq!(msg.body, InboundBody::Ping);
    }

    #[test]
    fn type_is_case_insensitive() {
        let msg = InboundMessage::parse(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.body, InboundBody::Ping);
        assert_eq!(msg.nonce, None);
    }

    #[test]
    fn parses_authentication_with_and_without_token() {
        let msg = InboundMessage::parse(r#"{"type":"AUTHENTICATION","token":"t0k"}"#).unwrap();
        assert_eq!(
            msg.body,
            InboundBody::Authenticate {
                token: Some("t0k".into())
            }
        );

        let msg = InboundMessage::parse(r#"{"type":"AUTHENTICATION","nonce":"n"}"#).unwrap();
        assert_eq!(msg.body, InboundBody::Authenticate { token: None });
    }

    #[test]
    fn unknown_type_keeps_nonce() {
        let err = InboundMessage::parse(r#"{"type":"LISTEN","nonce":"n1"}"#).unwrap_err();
        assert_eq!(err.nonce, Some(json!("n1")));
        assert!(err.message.contains("LISTEN"));
    }

    #[test]
    fn missing_type_is_an_error() {
        let err = InboundMessage::parse(r#"{"nonce":"n2"}"#).unwrap_err();
        assert_eq!(err.nonce, Some(json!("n2")));
        assert_eq!(err.message, "Missing message type");
    }

    #[test]
    fn non_string_nonce_is_kept() {
        let msg = InboundMessage::parse(r#"{"type":"PING","nonce":123}"#).unwrap();
        assert_eq!(msg.nonce, Some(json!(123)));
        assert_eq!(
            serde_json::to_value(OutboundMessage::pong(msg.nonce)).unwrap(),
            json!({ "type": "PONG", "nonce": 123 })
        );

        let msg = InboundMessage::parse(r#"{"type":"PING","nonce":{"seq":[1,2]}}"#).unwrap();
        assert_eq!(msg.nonce, Some(json!({ "seq": [1, 2] })));
    }

    #[test]
    fn null_nonce_is_absent() {
        let msg = InboundMessage::parse(r#"{"type":"PING","nonce":null}"#).unwrap();
        assert_eq!(msg.nonce, None);
    }

    #[test]
    fn nonce_survives_a_bad_type() {
        let err = InboundMessage::parse(r#"{"type":7,"nonce":42}"#).unwrap_err();
        assert_eq!(err.nonce, Some(json!(42)));
        assert_eq!(err.message, "Message type must be a string");
    }

    #[test]
    fn non_string_token_is_rejected_without_echoing_it() {
        let err =
            InboundMessage::parse(r#"{"type":"AUTHENTICATION","nonce":"t","token":98765}"#)
                .unwrap_err();
        assert_eq!(err.nonce, Some(json!("t")));
        assert!(!err.message.contains("98765"));
    }

    #[test]
    fn body_kind_matches_wire_type() {
        assert_eq!(InboundBody::Ping.kind(), "PING");
        assert_eq!(InboundBody::Authenticate { token: None }.kind(), "AUTHENTICATION");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert_matches!(
            InboundMessage::parse("not json at all"),
            Err(ProtocolError { nonce: None, .. })
        );
        assert_matches!(InboundMessage::parse("[1,2,3]"), Err(_));
    }

    #[test]
    fn pong_serializes_with_nonce() {
        let json = serde_json::to_value(OutboundMessage::pong(Some("abc".into()))).unwrap();
        assert_eq!(json, json!({ "type": "PONG", "nonce": "abc" }));

        let json = serde_json::to_value(OutboundMessage::pong(None)).unwrap();
        assert_eq!(json, json!({ "type": "PONG" }));
    }

    #[test]
    fn error_response_serializes_enumerated_kind() {
        let msg = OutboundMessage::error(None, ErrorKind::InvalidToken, "Invalid token");
        assert_eq!(
            serde_json::to_value(msg).unwrap(),
            json!({ "type": "RESPONSE", "error": "INVALID_TOKEN", "message": "Invalid token" })
        );
    }

    #[test]
    fn protocol_error_becomes_invalid_message_response() {
        let err = InboundMessage::parse(r#"{"type":"NOPE","nonce":"x"}"#).unwrap_err();
        let json = serde_json::to_value(OutboundMessage::from(err)).unwrap();
        assert_eq!(json["type"], "RESPONSE");
        assert_eq!(json["nonce"], "x");
        assert_eq!(json["error"], "INVALID_MESSAGE");
    }
}
