//! Upstream EventSub webhook vocabulary and event normalization.
//!
//! [`raw`] mirrors the upstream JSON shapes (snake_case, string ids, RFC 3339
//! timestamps). [`normalize`] turns them into the [`NormalizedEvent`] shape
//! pushed to socket clients.

pub mod normalize;
pub mod raw;

pub use normalize::{normalize, NormalizeError, Normalized, NormalizedEvent};

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Header carrying the webhook message type.
pub const HEADER_MESSAGE_TYPE: &str = "twitch-eventsub-message-type";

/// Header carrying the unique message id.
pub const HEADER_MESSAGE_ID: &str = "twitch-eventsub-message-id";

/// Header carrying the RFC 3339 send timestamp.
pub const HEADER_MESSAGE_TIMESTAMP: &str = "twitch-eventsub-message-timestamp";

/// Header carrying the `sha256=` HMAC signature.
pub const HEADER_MESSAGE_SIGNATURE: &str = "twitch-eventsub-message-signature";

/// The only message type that is processed; every other value is refused.
pub const MESSAGE_TYPE_NOTIFICATION: &str = "notification";

// ---------------------------------------------------------------------------
// Subscription types
// ---------------------------------------------------------------------------

/// The upstream subscription types this relay understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionType {
    Follow,
    RewardAdd,
    RewardUpdate,
    RewardRemove,
    RedemptionAdd,
    RedemptionUpdate,
}

impl SubscriptionType {
    pub const ALL: [SubscriptionType; 6] = [
        Self::Follow,
        Self::RewardAdd,
        Self::RewardUpdate,
        Self::RewardRemove,
        Self::RedemptionAdd,
        Self::RedemptionUpdate,
    ];

    /// Look up a subscription type by its upstream name.
    ///
    /// Returns `None` for names this relay does not handle.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "channel.follow" => Some(Self::Follow),
            "channel.channel_points_custom_reward.add" => Some(Self::RewardAdd),
            "channel.channel_points_custom_reward.update" => Some(Self::RewardUpdate),
            "channel.channel_points_custom_reward.remove" => Some(Self::RewardRemove),
            "channel.channel_points_custom_reward_redemption.add" => Some(Self::RedemptionAdd),
            "channel.channel_points_custom_reward_redemption.update" => {
                Some(Self::RedemptionUpdate)
            }
            _ => None,
        }
    }

    /// The upstream name of this subscription type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Follow => "channel.follow",
            Self::RewardAdd => "channel.channel_points_custom_reward.add",
            Self::RewardUpdate => "channel.channel_points_custom_reward.update",
            Self::RewardRemove => "channel.channel_points_custom_reward.remove",
            Self::RedemptionAdd => "channel.channel_points_custom_reward_redemption.add",
            Self::RedemptionUpdate => "channel.channel_points_custom_reward_redemption.update",
        }
    }
}

impl std::fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
