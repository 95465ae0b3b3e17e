/// Errors that stop a webhook or token lookup from being processed.
///
/// Event payloads that fail to normalize are not errors at this level; the
/// webhook acknowledges them and drops them (see `NormalizeError`).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
