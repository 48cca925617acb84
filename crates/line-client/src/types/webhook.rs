//! Webhook event types sent by the LINE platform.

use serde::{Deserialize, Serialize};

/// Body of a webhook delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookRequest {
    /// Bot user ID that received the events.
    #[serde(default)]
    pub destination: Option<String>,

    /// Events in this delivery (may be empty for verification requests).
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// A single webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    /// The user added the account as a friend (or unblocked it).
    Follow {
        #[serde(rename = "replyToken", default)]
        reply_token: Option<String>,
        source: EventSource,
    },

    /// The user blocked the account.
    Unfollow { source: EventSource },

    /// The user sent a message.
    Message {
        #[serde(rename = "replyToken")]
        reply_token: String,
        source: EventSource,
        message: MessageContent,
    },

    /// Any event type this service does not handle.
    #[serde(other)]
    Other,
}

impl WebhookEvent {
    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::Follow { .. } => "follow",
            WebhookEvent::Unfollow { .. } => "unfollow",
            WebhookEvent::Message { .. } => "message",
            WebhookEvent::Other => "other",
        }
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// `user`, `group` or `room`.
    #[serde(rename = "type", default)]
    pub source_type: String,

    /// Sending user, when the user consented to sharing it.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Content of a message event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    /// Text message.
    Text {
        #[serde(default)]
        id: Option<String>,
        text: String,
    },

    /// Stickers, images, locations and so on.
    #[serde(other)]
    Other,
}
