//! Upstream EventSub payload shapes, deserialized as received.

use serde::Deserialize;

/// The outer webhook body: `{ "subscription": {...}, "event": {...} }`.
///
/// Only the subscription type is needed for dispatch; the event stays as raw
/// JSON until the type is known.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub subscription: Subscription,
    #[serde(default)]
    pub event: serde_json::Value,
}

/// Subscription metadata attached to every notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// `channel.follow`
#[derive(Debug, Clone, Deserialize)]
pub struct Follow {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub followed_at: String,
}

/// `channel.channel_points_custom_reward.{add,update,remove}`
#[derive(Debug, Clone, Deserialize)]
pub struct CustomReward {
    pub id: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub is_enabled: bool,
    pub is_paused: bool,
    pub is_in_stock: bool,
    pub title: String,
    pub cost: i64,
    pub prompt: String,
    pub is_user_input_required: bool,
    pub should_redemptions_skip_request_queue: bool,
    #[serde(default)]
    pub cooldown_expires_at: Option<String>,
    #[serde(default)]
    pub redemptions_redeemed_current_stream: Option<i64>,
    pub max_per_stream: Limit,
    pub max_per_user_per_stream: Limit,
    pub global_cooldown: Cooldown,
    pub background_color: String,
    #[serde(default)]
    pub image: Option<Image>,
    pub default_image: Image,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limit {
    pub is_enabled: bool,
    pub value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cooldown {
    pub is_enabled: bool,
    pub seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url_1x: String,
    pub url_2x: String,
    pub url_4x: String,
}

/// `channel.channel_points_custom_reward_redemption.{add,update}`
#[derive(Debug, Clone, Deserialize)]
pub struct Redemption {
    pub id: String,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub user_input: Option<String>,
    pub status: String,
    pub reward: RedeemedReward,
    pub redeemed_at: String,
}

/// The reward summary embedded in a redemption.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemedReward {
    pub id: String,
    pub title: String,
    pub cost: i64,
    pub prompt: String,
}
