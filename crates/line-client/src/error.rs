//! Error types for line-client.

use thiserror::Error;

/// Errors that can occur when talking to LINE.
#[derive(Debug, Error)]
pub enum LineError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the Messaging API.
    #[error("LINE API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Authorization code exchange failed.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Profile fetch failed.
    #[error("profile fetch failed: {0}")]
    Profile(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
