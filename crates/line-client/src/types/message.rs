//! Outbound message types.

use serde::{Deserialize, Serialize};

/// A message object accepted by the push and reply endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Plain text message.
    Text { text: String },

    /// Flex message with a JSON layout.
    Flex {
        /// Text shown in notifications and chat lists.
        #[serde(rename = "altText")]
        alt_text: String,
        /// Bubble or carousel container.
        contents: serde_json::Value,
    },
}

impl Message {
    /// Create a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text { text: text.into() }
    }

    /// Create a flex message.
    pub fn flex(alt_text: impl Into<String>, contents: serde_json::Value) -> Self {
        Message::Flex {
            alt_text: alt_text.into(),
            contents,
        }
    }

    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Text { .. } => "text",
            Message::Flex { .. } => "flex",
        }
    }
}

/// Body of `POST /v2/bot/message/push`.
#[derive(Debug, Clone, Serialize)]
pub struct PushRequest<'a> {
    /// Recipient user ID.
    pub to: &'a str,
    pub messages: &'a [Message],
}

/// Body of `POST /v2/bot/message/reply`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest<'a> {
    /// Single-use token from a webhook event.
    pub reply_token: &'a str,
    pub messages: &'a [Message],
}

/// Error body returned by the Messaging API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_wire_format() {
        let value = serde_json::to_value(Message::text("こんにちは")).unwrap();
        assert_eq!(value, json!({ "type": "text", "text": "こんにちは" }));
    }

    #[test]
    fn test_flex_message_wire_format() {
        let message = Message::flex("alt", json!({ "type": "bubble" }));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({ "type": "flex", "altText": "alt", "contents": { "type": "bubble" } })
        );
        assert_eq!(message.kind(), "flex");
    }

    #[test]
    fn test_reply_request_uses_camel_case() {
        let messages = [Message::text("hi")];
        let value = serde_json::to_value(ReplyRequest {
            reply_token: "token",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(value["replyToken"], "token");
    }
}
