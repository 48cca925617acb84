//! Admin password check and configuration report.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, AppJson, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyAdminRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyAdminResponse {
    pub success: bool,
    pub message: String,
}

/// Check the admin page password.
pub async fn verify_admin(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyAdminRequest>,
) -> Result<Response> {
    let password = req.password.unwrap_or_default();
    if password.is_empty() {
        let body = VerifyAdminResponse {
            success: false,
            message: "パスワードを入力してください".to_string(),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    match state.config.check_admin_password(&password) {
        None => Err(AppError::Misconfigured("ADMIN_PASSWORD".to_string())),
        Some(true) => {
            info!("Admin password accepted");
            Ok(Json(VerifyAdminResponse {
                success: true,
                message: "認証成功".to_string(),
            })
            .into_response())
        }
        Some(false) => {
            warn!("Admin password rejected");
            Err(AppError::Unauthorized("パスワードが正しくありません".to_string()))
        }
    }
}

/// Report which settings are present. Disabled in production.
pub async fn debug_env(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let config = &state.config;
    if config.is_production() {
        return Err(AppError::Forbidden);
    }

    let smtp = config.smtp.as_ref();
    let capacity = config.capacity.to_string();

    Ok(Json(json!({
        "success": true,
        "message": "環境変数の設定状況",
        "envCheck": {
            "DATABASE_URL": true,
            "LINE_CHANNEL_SECRET": config.line.channel_secret.is_some(),
            "LINE_CHANNEL_ACCESS_TOKEN": config.line.channel_access_token.is_some(),
            "LINE_CHANNEL_ID": config.line.channel_id.is_some(),
            "LINE_LOGIN_REDIRECT_URI": config.line.login_redirect_uri.is_some(),
            "SMTP_HOST": smtp.is_some(),
            "MAIL_FROM": smtp.is_some(),
            "ADMIN_PASSWORD": config.admin_password.is_some(),
            "EVENT_CAPACITY": capacity,
            "PUBLIC_BASE_URL": config.public_base_url,
            "APP_ENV": config.environment.as_str(),
        },
        "envValues": {
            "MAIL_FROM": smtp.map(|s| s.from.as_str()),
            "LINE_CHANNEL_ID": config.line.channel_id,
            "LINE_LOGIN_REDIRECT_URI": config.login_redirect_uri(),
            "EVENT_CAPACITY": capacity,
            "PUBLIC_BASE_URL": config.public_base_url,
            "APP_ENV": config.environment.as_str(),
        },
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })))
}
