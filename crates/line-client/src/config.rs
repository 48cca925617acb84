//! Configuration types for line-client.

use secrecy::{ExposeSecret, SecretString};

/// Default LINE Messaging API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.line.me";

/// Credentials and endpoint for the LINE Messaging API.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Base URL of the Messaging API (overridable for tests).
    pub api_base_url: String,
    /// Long-lived channel access token.
    channel_access_token: SecretString,
    /// Channel secret, used for webhook signatures.
    channel_secret: SecretString,
}

impl LineConfig {
    /// Create a configuration pointing at the public LINE API.
    pub fn new(channel_access_token: impl Into<String>, channel_secret: impl Into<String>) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            channel_access_token: SecretString::from(channel_access_token.into()),
            channel_secret: SecretString::from(channel_secret.into()),
        }
    }

    /// Builder method to set the API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the push endpoint URL.
    pub fn push_url(&self) -> String {
        format!("{}/v2/bot/message/push", self.api_base_url)
    }

    /// Get the reply endpoint URL.
    pub fn reply_url(&self) -> String {
        format!("{}/v2/bot/message/reply", self.api_base_url)
    }

    pub(crate) fn access_token(&self) -> &str {
        self.channel_access_token.expose_secret()
    }

    /// Get the channel secret (exposes the secret).
    pub fn channel_secret(&self) -> &str {
        self.channel_secret.expose_secret()
    }
}
