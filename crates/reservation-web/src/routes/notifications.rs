//! Manual notification sending for development and testing.

use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use notifier::{DispatchOutcome, NotificationData};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppJson, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<NotificationData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: NotificationData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub success: bool,
    pub message: String,
    pub result: DispatchOutcome,
    pub test_data: TestData,
    pub timestamp: String,
}

/// Payload used when the request carries no `data`.
fn sample_data() -> NotificationData {
    NotificationData {
        id: "test-reservation-id".to_string(),
        name: "テストユーザー".to_string(),
        affiliation: "テスト大学".to_string(),
        favorite: "プログラミング".to_string(),
        email: "test@example.com".to_string(),
    }
}

/// Dispatch a notification to an arbitrary user. Disabled in production.
pub async fn send_line_notification(
    State(state): State<AppState>,
    body: std::result::Result<AppJson<NotificationRequest>, AppError>,
) -> Result<Json<NotificationResponse>> {
    if state.config.is_production() {
        return Err(AppError::Forbidden);
    }
    let AppJson(req) = body?;

    let user_id = req
        .user_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("userId は必須です".to_string()))?;
    let kind = req
        .kind
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("type は必須です".to_string()))?;
    let data = req.data.unwrap_or_else(sample_data);

    info!(recipient = %user_id, kind = %kind, "Sending test notification");
    let result = state.notifier.dispatch(Some(&user_id), &kind, &data).await;
    info!(recipient = %user_id, result = ?result, "Test notification finished");

    Ok(Json(NotificationResponse {
        success: true,
        message: "LINE通知テストが完了しました".to_string(),
        result,
        test_data: TestData {
            user_id,
            kind,
            data,
        },
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
