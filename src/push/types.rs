//! Push API payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// SPACES
// ============================================================================

/// Body of `POST /apis/v1/spaces`.
///
/// Field order is the order the verification proof is computed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceBody {
    pub space_name: String,
    pub space_description: String,
    pub members: Vec<String>,
    pub space_image: Option<String>,
    pub admins: Vec<String>,
    pub is_public: bool,
    pub space_creator: String,
    pub schedule_at: String,
    pub schedule_end: String,
    pub rules: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_proof: Option<String>,
}

// ============================================================================
// CHANNELS
// ============================================================================

/// Body of `POST /apis/v1/channels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelBody {
    pub channel: String,
    pub name: String,
    pub info: String,
    pub url: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_proof: Option<String>,
}

/// Message signed when opting in to a channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeMessage {
    pub channel: String,
    pub subscriber: String,
    pub action: String,
    pub user_setting: String,
}

/// Body of `POST /apis/v1/channels/{channel}/subscribe`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    pub verification_proof: String,
    pub message: SubscribeMessage,
}

// ============================================================================
// FEEDS
// ============================================================================

/// One notification from a user's inbox.
///
/// Only the fields the relay routes on are typed; the rest is kept so the item
/// can be forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub payload_id: u64,
    pub sender: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Response of `GET /apis/v1/users/{user}/feeds`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub feeds: Vec<FeedItem>,
}

/// Body POSTed to a subscriber's webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookDelivery<'a> {
    pub body: &'a FeedItem,
}
