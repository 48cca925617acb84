//! LINE webhook: friend events and the chat menu.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use database::{reservation, DatabaseError, ReservationStatus};
use line_client::{verify_signature, Message, MessageContent, WebhookEvent, WebhookRequest, SIGNATURE_HEADER};
use notifier::{confirmation_message, EventDetails};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::routes::notification_data;
use crate::state::AppState;

const NOT_FOUND_TEXT: &str = "予約が見つかりませんでした。\n\n予約IDをもう一度確認してください。";
const ERROR_TEXT: &str = "エラーが発生しました。もう一度お試しください。";
const LOOKUP_ERROR_TEXT: &str = "予約情報の取得に失敗しました。しばらくしてから再度お試しください。";
const NO_RESERVATION_TEXT: &str =
    "現在、確定済みの予約はありません。\n\n予約する場合は「予約」と送信してください。";

/// Receive a webhook delivery.
///
/// The signature is checked whenever a channel secret is configured.
/// Failures of single events are logged and do not fail the delivery.
pub async fn line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    if let Some(secret) = state.config.line.channel_secret.as_ref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret.expose_secret(), &body, signature) {
            warn!("Rejected LINE webhook with invalid signature");
            return Err(AppError::Unauthorized("署名が正しくありません".to_string()));
        }
    }

    let request: WebhookRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "Malformed webhook body");
        AppError::Validation("リクエストの形式が正しくありません".to_string())
    })?;

    if request.events.is_empty() {
        return Ok(Json(json!({ "message": "No events" })));
    }

    let processed = request.events.len();
    for event in request.events {
        let kind = event.kind();
        if let Err(e) = handle_event(&state, event).await {
            warn!(event = kind, error = %e, "Webhook event failed");
        }
    }

    Ok(Json(json!({ "success": true, "processed": processed })))
}

async fn handle_event(state: &AppState, event: WebhookEvent) -> Result<()> {
    match event {
        WebhookEvent::Follow { source, .. } => {
            info!(line_user_id = ?source.user_id, "LINE follow");
            if let (Some(sender), Some(user_id)) = (state.notifier.sender(), source.user_id.as_deref()) {
                let welcome = welcome_text(state.notifier.event());
                sender.push(user_id, &[Message::text(welcome)]).await?;
            }
        }
        WebhookEvent::Unfollow { source } => {
            info!(line_user_id = ?source.user_id, "LINE unfollow");
        }
        WebhookEvent::Message {
            reply_token,
            source,
            message: MessageContent::Text { text, .. },
        } => {
            let reply = respond_to_text(state, source.user_id.as_deref(), text.trim()).await;
            match state.notifier.sender() {
                Some(sender) => sender.reply(&reply_token, &[reply]).await?,
                None => warn!("LINE credentials not configured, dropping reply"),
            }
        }
        other => debug!(event = other.kind(), "Ignoring webhook event"),
    }
    Ok(())
}

/// Pick the reply for a text message.
async fn respond_to_text(state: &AppState, user_id: Option<&str>, text: &str) -> Message {
    let event = state.notifier.event();

    if is_reservation_id(text) {
        return link_reservation(state, user_id, &text.to_ascii_lowercase()).await;
    }
    if contains_any(text, &["予約", "よやく"]) {
        return Message::text(format!("予約は以下のURLからお願いします！\n\n{}", event.base_url));
    }
    if contains_any(text, &["キャンセル", "きゃんせる"]) {
        return Message::text(format!(
            "キャンセルは以下のURLからお願いします！\n\n{}",
            event.cancel_url(None)
        ));
    }
    if contains_any(text, &["確認", "かくにん"]) {
        return latest_reservation(state, user_id).await;
    }

    Message::text(help_text(event))
}

/// Attach the sender to a reservation and show its card.
async fn link_reservation(state: &AppState, user_id: Option<&str>, id: &str) -> Message {
    let pool = state.db.pool();

    let found = match reservation::get_reservation(pool, id).await {
        Ok(found) => found,
        Err(DatabaseError::NotFound { .. }) => return Message::text(NOT_FOUND_TEXT),
        Err(e) => {
            error!(reservation_id = %id, error = %e, "Reservation lookup failed");
            return Message::text(ERROR_TEXT);
        }
    };

    if found.status == ReservationStatus::Cancelled {
        return Message::text(format!(
            "この予約はキャンセル済みです。\n\n【予約情報】\nお名前: {}\nステータス: キャンセル済み",
            found.name
        ));
    }

    match user_id {
        Some(user_id) => {
            if let Err(e) = reservation::link_line_user(pool, &found.id, user_id).await {
                error!(reservation_id = %found.id, error = %e, "Linking LINE user failed");
                return Message::text(ERROR_TEXT);
            }
            info!(reservation_id = %found.id, line_user_id = %user_id, "LINE user linked");
        }
        None => warn!(reservation_id = %found.id, "Message without user ID, not linking"),
    }

    confirmation_message(state.notifier.event(), &notification_data(&found))
}

/// Describe the sender's newest confirmed reservation.
async fn latest_reservation(state: &AppState, user_id: Option<&str>) -> Message {
    let Some(user_id) = user_id else {
        return Message::text(NO_RESERVATION_TEXT);
    };

    match reservation::latest_confirmed_for_line_user(state.db.pool(), user_id).await {
        Ok(Some(found)) => {
            let event = state.notifier.event();
            Message::text(format!(
                "📋 予約情報\n\n\
                 お名前: {}\n\
                 所属: {}\n\
                 今の推し: {}\n\
                 メール: {}\n\
                 予約ID: {}\n\n\
                 ━━━━━━━━━━━━\n\
                 📅 イベント詳細\n\
                 日時: {}\n\
                 会場: {}\n\n\
                 キャンセルする場合は「キャンセル」と送信してください。",
                found.name,
                found.affiliation,
                found.favorite,
                found.email,
                found.id,
                event.schedule,
                event.venue
            ))
        }
        Ok(None) => Message::text(NO_RESERVATION_TEXT),
        Err(e) => {
            error!(line_user_id = %user_id, error = %e, "Reservation lookup failed");
            Message::text(LOOKUP_ERROR_TEXT)
        }
    }
}

fn welcome_text(event: &EventDetails) -> String {
    format!(
        "🍱 {}へようこそ！\n\n\
         このLINEアカウントでは、予約の確認通知やキャンセル通知をお送りします。\n\n\
         予約する際は、このLINE公式アカウントと連携してください。",
        event.title
    )
}

fn help_text(event: &EventDetails) -> String {
    format!(
        "こんにちは！{}です🍱\n\n\
         以下のメッセージを送信してください：\n\
         ・「予約」- 予約ページを表示\n\
         ・「確認」- 予約情報を確認\n\
         ・「キャンセル」- キャンセルページを表示",
        event.title
    )
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Hyphenated UUID, case-insensitive.
fn is_reservation_id(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_reservation_id() {
        assert!(is_reservation_id("7f1c2d9e-1a2b-4c3d-8e4f-0123456789ab"));
        assert!(is_reservation_id("7F1C2D9E-1A2B-4C3D-8E4F-0123456789AB"));
        assert!(!is_reservation_id("7f1c2d9e1a2b4c3d8e4f0123456789ab"));
        assert!(!is_reservation_id("7f1c2d9e-1a2b-4c3d-8e4f-0123456789ag"));
        assert!(!is_reservation_id("予約"));
    }

    #[test]
    fn test_help_text_lists_keywords() {
        let text = help_text(&EventDetails::default());
        assert!(text.starts_with("こんにちは！みなとランチです🍱"));
        assert!(text.contains("・「確認」- 予約情報を確認"));
    }
}
