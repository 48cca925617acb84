//! Message rendering for each notification kind.

use line_client::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const CONFIRM_COLOR: &str = "#667eea";
const CANCEL_COLOR: &str = "#764ba2";
const TEXT_COLOR: &str = "#666666";
const LABEL_COLOR: &str = "#aaaaaa";

/// Fixed copy describing the event, plus the public site URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub title: String,
    /// Date and time, e.g. `11月27日(木) 12:00〜13:00`.
    pub schedule: String,
    pub venue: String,
    /// Venue name short enough for a flex row.
    pub venue_short: String,
    pub fee: String,
    /// Public site URL without trailing slash.
    pub base_url: String,
}

impl Default for EventDetails {
    fn default() -> Self {
        Self {
            title: "みなとランチ".to_string(),
            schedule: "11月27日(木) 12:00〜13:00".to_string(),
            venue: "VOYAGE（神奈川大学みなとみらいキャンパス 1階）".to_string(),
            venue_short: "VOYAGE（神奈川大学 1階）".to_string(),
            fee: "1,000円（ランチ付き）".to_string(),
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl EventDetails {
    /// Builder method to set the public site URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Page listing reservations.
    pub fn reservations_url(&self) -> String {
        format!("{}/reservations.html", self.base_url)
    }

    /// Cancel page, optionally prefilled with a reservation.
    pub fn cancel_url(&self, prefill: Option<(&str, &str)>) -> String {
        match prefill {
            Some((id, email)) => {
                let id: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
                let email: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
                format!("{}/cancel.html?id={}&email={}", self.base_url, id, email)
            }
            None => format!("{}/cancel.html", self.base_url),
        }
    }
}

/// Reservation fields carried by a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub favorite: String,
    #[serde(default)]
    pub email: String,
}

/// Flex message confirming a reservation.
pub fn confirmation_message(event: &EventDetails, data: &NotificationData) -> Message {
    Message::flex(
        format!("【{}】予約確認", event.title),
        confirmation_bubble(event, data),
    )
}

/// Flex message confirming a cancellation.
pub fn cancellation_message(event: &EventDetails, data: &NotificationData) -> Message {
    Message::flex(
        format!("【{}】キャンセル完了", event.title),
        cancellation_bubble(data),
    )
}

/// Day-before reminder text.
pub fn reminder_message(event: &EventDetails) -> Message {
    Message::text(format!(
        "🔔 リマインダー\n\n明日は「{}」の開催日です！\n\n日時: {}\n会場: {}\n\nお待ちしております！",
        event.title, event.schedule, event.venue
    ))
}

fn hero(icon: &str, title: &str, color: &str) -> Value {
    json!({
        "type": "box",
        "layout": "vertical",
        "contents": [
            { "type": "text", "text": icon, "size": "4xl", "align": "center", "margin": "md" },
            { "type": "text", "text": title, "weight": "bold", "size": "xl", "align": "center", "color": "#ffffff" }
        ],
        "backgroundColor": color,
        "paddingAll": "20px"
    })
}

fn row(label: &str, label_color: &str, value: &str, value_size: &str) -> Value {
    json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": label, "color": label_color, "size": "sm", "flex": 0 },
            { "type": "text", "text": value, "wrap": true, "color": TEXT_COLOR, "size": value_size, "align": "end" }
        ]
    })
}

fn section(heading: Option<(&str, &str)>, rows: Vec<Value>) -> Value {
    let mut contents = Vec::with_capacity(rows.len() + 1);
    if let Some((text, color)) = heading {
        contents.push(json!({ "type": "text", "text": text, "weight": "bold", "size": "md", "color": color }));
    }
    contents.extend(rows);

    json!({
        "type": "box",
        "layout": "vertical",
        "margin": "xl",
        "spacing": "sm",
        "contents": contents
    })
}

fn separator() -> Value {
    json!({ "type": "separator", "margin": "xl" })
}

fn confirmation_bubble(event: &EventDetails, data: &NotificationData) -> Value {
    let details = section(
        None,
        vec![
            row("📅 日時", CONFIRM_COLOR, &event.schedule, "sm"),
            row("📍 会場", CONFIRM_COLOR, &event.venue_short, "sm"),
            row("💰 会費", CONFIRM_COLOR, &event.fee, "sm"),
        ],
    );
    let reservation = section(
        Some(("ご予約情報", CONFIRM_COLOR)),
        vec![
            row("お名前", LABEL_COLOR, &data.name, "sm"),
            row("所属", LABEL_COLOR, &data.affiliation, "sm"),
            row("今の推し", LABEL_COLOR, &data.favorite, "sm"),
        ],
    );

    json!({
        "type": "bubble",
        "hero": hero("🍱", "予約確認", CONFIRM_COLOR),
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                { "type": "text", "text": format!("{} 様", data.name), "weight": "bold", "size": "lg", "margin": "md" },
                {
                    "type": "text",
                    "text": format!("この度は「{}」へのお申し込みありがとうございます。", event.title),
                    "wrap": true, "color": TEXT_COLOR, "size": "sm", "margin": "md"
                },
                separator(),
                details,
                separator(),
                reservation
            ]
        },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "spacing": "sm",
            "contents": [
                {
                    "type": "button",
                    "style": "primary",
                    "height": "sm",
                    "action": { "type": "uri", "label": "予約詳細を確認", "uri": event.reservations_url() },
                    "color": CONFIRM_COLOR
                },
                {
                    "type": "button",
                    "style": "link",
                    "height": "sm",
                    "action": {
                        "type": "uri",
                        "label": "キャンセルする",
                        "uri": event.cancel_url(Some((data.id.as_str(), data.email.as_str())))
                    }
                },
                {
                    "type": "box",
                    "layout": "vertical",
                    "contents": [{
                        "type": "text",
                        "text": "当日お会いできることを楽しみにしております！",
                        "wrap": true, "color": LABEL_COLOR, "size": "xs", "align": "center", "margin": "md"
                    }]
                }
            ],
            "flex": 0
        }
    })
}

fn cancellation_bubble(data: &NotificationData) -> Value {
    let info = section(
        Some(("キャンセル情報", CANCEL_COLOR)),
        vec![
            row("お名前", LABEL_COLOR, &data.name, "sm"),
            row("予約ID", LABEL_COLOR, &data.id, "xs"),
        ],
    );

    json!({
        "type": "bubble",
        "hero": hero("🔔", "キャンセル完了", CANCEL_COLOR),
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                { "type": "text", "text": format!("{} 様", data.name), "weight": "bold", "size": "lg", "margin": "md" },
                {
                    "type": "text",
                    "text": "予約のキャンセルを承りました。",
                    "wrap": true, "color": TEXT_COLOR, "size": "sm", "margin": "md"
                },
                separator(),
                info,
                separator(),
                {
                    "type": "text",
                    "text": "またの機会にお会いできることを楽しみにしております。",
                    "wrap": true, "color": TEXT_COLOR, "size": "sm", "margin": "xl"
                }
            ]
        }
    })
}
