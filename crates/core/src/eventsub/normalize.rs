//! Upstream-to-client event normalization.
//!
//! Ids arrive as strings and leave as integers, timestamps arrive as RFC 3339
//! and leave as epoch milliseconds, and the flat `broadcaster_user_*` /
//! `user_*` field triples are folded into nested [`UserRef`] objects. Optional
//! upstream values stay optional; nothing is defaulted.

use serde::Serialize;

use super::raw;
use super::SubscriptionType;
use crate::types::{DbId, EpochMillis};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A known subscription type whose event could not be normalized.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("field `{field}` is not a numeric id: {value:?}")]
    InvalidId { field: &'static str, value: String },

    #[error("field `{field}` is not an RFC 3339 timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("event payload does not match {subscription_type}: {source}")]
    Payload {
        subscription_type: SubscriptionType,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Normalized shapes
// ---------------------------------------------------------------------------

/// A user reference (`id`, `login`, `displayName`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: DbId,
    pub login: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEvent {
    pub user: UserRef,
    pub broadcaster: UserRef,
    pub followed_at: EpochMillis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    pub is_enabled: bool,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cooldown {
    pub is_enabled: bool,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardImage {
    pub url1x: String,
    pub url2x: String,
    pub url4x: String,
}

/// Payload shared by the reward added/updated/removed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEvent {
    pub reward_id: String,
    pub broadcaster: UserRef,
    pub is_enabled: bool,
    pub is_paused: bool,
    pub is_in_stock: bool,
    pub title: String,
    pub cost: i64,
    pub prompt: String,
    pub is_user_input_required: bool,
    pub should_redemptions_skip_request_queue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_expires_at: Option<EpochMillis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemptions_redeemed_current_stream: Option<i64>,
    pub max_per_stream: Limit,
    pub max_per_user_per_stream: Limit,
    pub global_cooldown: Cooldown,
    pub background_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<RewardImage>,
    pub default_image: RewardImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemedReward {
    pub reward_id: String,
    pub title: String,
    pub cost: i64,
    pub prompt: String,
}

/// Payload shared by the redemption added/updated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionEvent {
    pub redemption_id: String,
    pub broadcaster: UserRef,
    pub user: UserRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    pub status: String,
    pub reward: RedeemedReward,
    pub redeemed_at: EpochMillis,
}

/// An event in the shape delivered to socket clients.
///
/// Serializes as `{"type": "<KIND>", "event": {...}}`, which is exactly the
/// outbound event frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedEvent {
    Follow(FollowEvent),
    RewardAdded(RewardEvent),
    RewardUpdated(RewardEvent),
    RewardRemoved(RewardEvent),
    RewardRedeemed(RedemptionEvent),
    RedemptionUpdated(RedemptionEvent),
}

impl NormalizedEvent {
    /// The outbound `type` string for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Follow(_) => "FOLLOW",
            Self::RewardAdded(_) => "REWARD_ADDED",
            Self::RewardUpdated(_) => "REWARD_UPDATED",
            Self::RewardRemoved(_) => "REWARD_REMOVED",
            Self::RewardRedeemed(_) => "REWARD_REDEEMED",
            Self::RedemptionUpdated(_) => "REDEMPTION_UPDATED",
        }
    }

    /// The account that owns the event; used only for routing.
    pub fn broadcaster_user_id(&self) -> DbId {
        match self {
            Self::Follow(e) => e.broadcaster.id,
            Self::RewardAdded(e) | Self::RewardUpdated(e) | Self::RewardRemoved(e) => {
                e.broadcaster.id
            }
            Self::RewardRedeemed(e) | Self::RedemptionUpdated(e) => e.broadcaster.id,
        }
    }
}

/// Outcome of normalizing a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Event(NormalizedEvent),
    /// The subscription type is not one this relay handles. Not an error.
    Unrecognized(String),
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a raw upstream event according to its subscription type.
pub fn normalize(
    subscription_type: &str,
    event: serde_json::Value,
) -> Result<Normalized, NormalizeError> {
    let Some(ty) = SubscriptionType::parse(subscription_type) else {
        return Ok(Normalized::Unrecognized(subscription_type.to_string()));
    };

    let normalized = match ty {
        SubscriptionType::Follow => NormalizedEvent::Follow(follow(decode(ty, event)?)?),
        SubscriptionType::RewardAdd => NormalizedEvent::RewardAdded(reward(decode(ty, event)?)?),
        SubscriptionType::RewardUpdate => {
            NormalizedEvent::RewardUpdated(reward(decode(ty, event)?)?)
        }
        SubscriptionType::RewardRemove => {
            NormalizedEvent::RewardRemoved(reward(decode(ty, event)?)?)
        }
        SubscriptionType::RedemptionAdd => {
            NormalizedEvent::RewardRedeemed(redemption(decode(ty, event)?)?)
        }
        SubscriptionType::RedemptionUpdate => {
            NormalizedEvent::RedemptionUpdated(redemption(decode(ty, event)?)?)
        }
    };

    Ok(Normalized::Event(normalized))
}

fn decode<T: serde::de::DeserializeOwned>(
    subscription_type: SubscriptionType,
    event: serde_json::Value,
) -> Result<T, NormalizeError> {
    serde_json::from_value(event).map_err(|source| NormalizeError::Payload {
        subscription_type,
        source,
    })
}

fn follow(e: raw::Follow) -> Result<FollowEvent, NormalizeError> {
    Ok(FollowEvent {
        user: user_ref("user_id", &e.user_id, e.user_login, e.user_name)?,
        broadcaster: user_ref(
            "broadcaster_user_id",
            &e.broadcaster_user_id,
            e.broadcaster_user_login,
            e.broadcaster_user_name,
        )?,
        followed_at: epoch_millis("followed_at", &e.followed_at)?,
    })
}

fn reward(e: raw::CustomReward) -> Result<RewardEvent, NormalizeError> {
    Ok(RewardEvent {
        reward_id: e.id,
        broadcaster: user_ref(
            "broadcaster_user_id",
            &e.broadcaster_user_id,
            e.broadcaster_user_login,
            e.broadcaster_user_name,
        )?,
        is_enabled: e.is_enabled,
        is_paused: e.is_paused,
        is_in_stock: e.is_in_stock,
        title: e.title,
        cost: e.cost,
        prompt: e.prompt,
        is_user_input_required: e.is_user_input_required,
        should_redemptions_skip_request_queue: e.should_redemptions_skip_request_queue,
        cooldown_expires_at: e
            .cooldown_expires_at
            .as_deref()
            .map(|ts| epoch_millis("cooldown_expires_at", ts))
            .transpose()?,
        redemptions_redeemed_current_stream: e.redemptions_redeemed_current_stream,
        max_per_stream: limit(e.max_per_stream),
        max_per_user_per_stream: limit(e.max_per_user_per_stream),
        global_cooldown: Cooldown {
            is_enabled: e.global_cooldown.is_enabled,
            seconds: e.global_cooldown.seconds,
        },
        background_color: e.background_color,
        image: e.image.map(image),
        default_image: image(e.default_image),
    })
}

fn redemption(e: raw::Redemption) -> Result<RedemptionEvent, NormalizeError> {
    Ok(RedemptionEvent {
        redemption_id: e.id,
        broadcaster: user_ref(
            "broadcaster_user_id",
            &e.broadcaster_user_id,
            e.broadcaster_user_login,
            e.broadcaster_user_name,
        )?,
        user: user_ref("user_id", &e.user_id, e.user_login, e.user_name)?,
        user_input: e.user_input,
        status: e.status,
        reward: RedeemedReward {
            reward_id: e.reward.id,
            title: e.reward.title,
            cost: e.reward.cost,
            prompt: e.reward.prompt,
        },
        redeemed_at: epoch_millis("redeemed_at", &e.redeemed_at)?,
    })
}

fn user_ref(
    id_field: &'static str,
    id: &str,
    login: String,
    display_name: String,
) -> Result<UserRef, NormalizeError> {
    Ok(UserRef {
        id: parse_id(id_field, id)?,
        login,
        display_name,
    })
}

fn limit(l: raw::Limit) -> Limit {
    Limit {
        is_enabled: l.is_enabled,
        value: l.value,
    }
}

fn image(i: raw::Image) -> RewardImage {
    RewardImage {
        url1x: i.url_1x,
        url2x: i.url_2x,
        url4x: i.url_4x,
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<DbId, NormalizeError> {
    value.parse().map_err(|_| NormalizeError::InvalidId {
        field,
        value: value.to_string(),
    })
}

fn epoch_millis(field: &'static str, value: &str) -> Result<EpochMillis, NormalizeError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| NormalizeError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
