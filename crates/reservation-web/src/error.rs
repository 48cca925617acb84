//! Error types for the reservation API.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::{DatabaseError, ValidationError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Message shown for unexpected server errors.
const INTERNAL_MESSAGE: &str = "処理中にエラーが発生しました。しばらくしてから再度お試しください。";

/// Errors that can occur in request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// No seats left.
    #[error("capacity exceeded")]
    CapacityExceeded,

    /// The reservation was cancelled before.
    #[error("already cancelled")]
    AlreadyCancelled,

    /// Unknown reservation, or id and email do not match.
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrong admin password.
    #[error("unauthorized")]
    Unauthorized(String),

    /// Endpoint disabled in production.
    #[error("forbidden")]
    Forbidden,

    /// A required setting is missing.
    #[error("server misconfigured: {0}")]
    Misconfigured(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DatabaseError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::CapacityExceeded { .. } => AppError::CapacityExceeded,
            DatabaseError::AlreadyCancelled { .. } => AppError::AlreadyCancelled,
            DatabaseError::NotFound { .. } => AppError::NotFound(
                "予約が見つかりません。予約IDまたはメールアドレスが正しいか確認してください。".to_string(),
            ),
            other => AppError::Database(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let message = match err {
            ValidationError::InvalidEmail(_) => "有効なメールアドレスを入力してください".to_string(),
            ValidationError::Empty(_) => "必須項目がすべて入力されていません".to_string(),
            ValidationError::TooLong { field, max, .. } => {
                format!("{}は{}文字以内で入力してください", field, max)
            }
        };
        AppError::Validation(message)
    }
}

impl From<line_client::LineError> for AppError {
    fn from(err: line_client::LineError) -> Self {
        AppError::Internal(format!("LINE API: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::Validation("リクエストの形式が正しくありません".to_string())
    }
}

/// Detail of a 500 response, attached as a response extension.
///
/// [`expose_internal_detail`] copies it into the body outside production.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, "Validation error", message),
            AppError::CapacityExceeded => (
                StatusCode::BAD_REQUEST,
                "Capacity exceeded",
                "申し訳ございません。定員に達したため予約を受け付けることができません".to_string(),
            ),
            AppError::AlreadyCancelled => (
                StatusCode::BAD_REQUEST,
                "Already cancelled",
                "この予約は既にキャンセルされています".to_string(),
            ),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, "Not found", message),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                "このAPIは本番環境では使用できません".to_string(),
            ),
            AppError::Unauthorized(message) => {
                let body = json!({ "success": false, "message": message });
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            AppError::Misconfigured(what) => {
                tracing::error!(missing = %what, "Server misconfigured");
                let body = json!({ "success": false, "message": "サーバー設定エラー" });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                return internal_response(err.to_string());
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                return internal_response(msg);
            }
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

fn internal_response(detail: String) -> Response {
    let body = ErrorBody {
        error: "Internal server error",
        message: INTERNAL_MESSAGE.to_string(),
    };
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    response.extensions_mut().insert(InternalDetail(detail));
    response
}

/// Response mapper that adds a `debug` field to 500 responses.
///
/// Installed only outside production. Status and headers are kept; only the
/// body is replaced.
pub async fn expose_internal_detail(response: Response) -> Response {
    let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned() else {
        return response;
    };

    let body = json!({
        "error": "Internal server error",
        "message": INTERNAL_MESSAGE,
        "debug": detail,
    });
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body.to_string()))
}

/// JSON extractor whose rejection is an [`AppError::Validation`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_database_errors_map_to_business_errors() {
        let err = AppError::from(DatabaseError::CapacityExceeded { capacity: 20 });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Capacity exceeded");

        let err = AppError::from(DatabaseError::NotFound {
            entity: "reservation",
            id: "x".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_internal_detail_hidden_until_exposed() {
        let mut response = AppError::Internal("disk full".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".parse().unwrap());

        let exposed = expose_internal_detail(response).await;
        assert_eq!(exposed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(exposed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(exposed.headers()[header::CONTENT_TYPE], "application/json");
        let body = body_json(exposed).await;
        assert_eq!(body["debug"], "disk full");

        let hidden = body_json(AppError::Internal("disk full".to_string()).into_response()).await;
        assert!(hidden.get("debug").is_none());
        assert_eq!(hidden["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_unauthorized_and_misconfigured_bodies() {
        let body = body_json(AppError::Unauthorized("パスワードが正しくありません".to_string()).into_response()).await;
        assert_eq!(body, json!({ "success": false, "message": "パスワードが正しくありません" }));

        let response = AppError::Misconfigured("ADMIN_PASSWORD".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "サーバー設定エラー");
    }
}
