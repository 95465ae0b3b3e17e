//! EventSub webhook signature verification.
//!
//! The upstream sender signs `message_id ++ timestamp ++ raw_body` with
//! HMAC-SHA256 keyed by the subscription secret and sends the digest as
//! `sha256=<lowercase hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Prefix carried by every signature header value.
pub const HMAC_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Build the byte string that gets signed.
///
/// When either the message id or the timestamp header is missing the
/// canonical message is empty. It is still signed and compared, so a
/// request without those headers can only pass with a signature over the
/// empty message.
pub fn canonical_message(
    message_id: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
) -> Vec<u8> {
    match (message_id, timestamp) {
        (Some(id), Some(ts)) => {
            let mut message = Vec::with_capacity(id.len() + ts.len() + body.len());
            message.extend_from_slice(id.as_bytes());
            message.extend_from_slice(ts.as_bytes());
            message.extend_from_slice(body);
            message
        }
        _ => Vec::new(),
    }
}

/// Compute `sha256=<hex>` over `message` keyed by `secret`.
pub fn compute_signature(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    format!("{HMAC_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Check a webhook signature header against the expected digest.
///
/// The comparison is constant-time over the rendered strings. Any mismatch,
/// including a missing or differently-sized header, returns `false`.
pub fn verify(
    secret: &[u8],
    message_id: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
    supplied_signature: &str,
) -> bool {
    let expected = compute_signature(secret, &canonical_message(message_id, timestamp, body));
    expected
        .as_bytes()
        .ct_eq(supplied_signature.as_bytes())
        .into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
