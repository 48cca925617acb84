//! LINE Login endpoints.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use line_client::{AuthorizationRequest, LineError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Cookie holding the issued login state.
pub const STATE_COOKIE: &str = "line_login_state";

#[derive(Debug, Serialize)]
pub struct LoginUrlResponse {
    pub success: bool,
    #[serde(flatten)]
    pub request: AuthorizationRequest,
}

/// Query parameters LINE appends to the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Issue an authorization URL and remember its state in a cookie.
pub async fn line_login(State(state): State<AppState>) -> Result<Response> {
    let client = state
        .login
        .as_ref()
        .ok_or_else(|| AppError::Misconfigured("LINE_CHANNEL_ID".to_string()))?;

    let request = client
        .authorization_request()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    info!("Issued LINE login URL");

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=600",
        STATE_COOKIE, request.state
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginUrlResponse {
            success: true,
            request,
        }),
    )
        .into_response())
}

/// Finish the login and send the browser back to the form.
pub async fn line_login_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let base = state.config.public_base_url.as_str();

    if let Some(error) = params.error.as_deref() {
        warn!(error = %error, "LINE login returned an error");
        return redirect_with(base, &[("line_login_error", error)]);
    }

    let (Some(code), Some(returned_state)) = (params.code.as_deref(), params.state.as_deref()) else {
        return redirect_with(base, &[("line_login_error", "missing_parameters")]);
    };

    if cookie_value(&headers, STATE_COOKIE).as_deref() != Some(returned_state) {
        if state.config.line.verify_login_state {
            warn!("LINE login state mismatch, rejecting callback");
            return redirect_with(base, &[("line_login_error", "invalid_state")]);
        }
        warn!("LINE login state does not match cookie");
    }

    let Some(client) = state.login.as_ref() else {
        error!("LINE login callback received but login is not configured");
        return redirect_with(base, &[("line_login_error", "LINE Loginが設定されていません")]);
    };

    match client.complete(code).await {
        Ok(profile) => {
            info!(line_user_id = %profile.user_id, "LINE login succeeded");
            redirect_with(
                base,
                &[
                    ("line_user_id", profile.user_id.as_str()),
                    ("line_display_name", profile.display_name.as_str()),
                    ("line_picture_url", profile.picture_url.as_deref().unwrap_or("")),
                    ("line_login_success", "true"),
                ],
            )
        }
        Err(e) => {
            error!(error = %e, "LINE login failed");
            redirect_with(base, &[("line_login_error", login_error_message(&e))])
        }
    }
}

fn login_error_message(err: &LineError) -> &'static str {
    match err {
        LineError::TokenExchange(_) => "トークン取得に失敗しました",
        LineError::Profile(_) => "プロフィール取得に失敗しました",
        _ => "LINEログインに失敗しました",
    }
}

/// Redirect to `base` with query parameters appended.
fn redirect_with(base: &str, params: &[(&str, &str)]) -> Redirect {
    let target = match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(params);
            url.to_string()
        }
        Err(_) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            format!("{}?{}", base, query)
        }
    };
    Redirect::to(&target)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
