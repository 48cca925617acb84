//! LINE Login (OAuth 2.1 / OpenID Connect) flow.
//!
//! Used only to learn a visitor's stable LINE user ID and display name so a
//! reservation can be linked for push notifications.

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::config::DEFAULT_API_BASE_URL;
use crate::error::LineError;

/// Default authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://access.line.me/oauth2/v2.1/authorize";

/// Scopes requested from the user.
pub const LOGIN_SCOPE: &str = "profile openid";

/// Length of the generated `state` and `nonce` values.
pub const STATE_LENGTH: usize = 32;

/// LINE Login channel settings.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Login channel ID (OAuth client ID).
    pub channel_id: String,
    /// Login channel secret (OAuth client secret).
    channel_secret: SecretString,
    /// Callback URL registered with the channel.
    pub redirect_uri: String,
    /// Authorization endpoint.
    pub authorize_url: String,
    /// Base URL for the token and profile endpoints.
    pub api_base_url: String,
}

impl LoginConfig {
    /// Create a configuration for the public LINE endpoints.
    pub fn new(
        channel_id: impl Into<String>,
        channel_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            channel_secret: SecretString::from(channel_secret.into()),
            redirect_uri: redirect_uri.into(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Builder method to set the authorization endpoint.
    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    /// Builder method to set the token/profile API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Token endpoint URL.
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.1/token", self.api_base_url)
    }

    /// Profile endpoint URL.
    pub fn profile_url(&self) -> String {
        format!("{}/v2/profile", self.api_base_url)
    }
}

/// First step of the flow: where to send the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub state: String,
    pub nonce: String,
}

/// Result of a completed login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProfile {
    /// Stable LINE user ID.
    pub user_id: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    user_id: String,
    display_name: String,
    #[serde(default)]
    picture_url: Option<String>,
}

/// Client for the LINE Login endpoints.
#[derive(Clone)]
pub struct LoginClient {
    http: Client,
    config: LoginConfig,
}

impl LoginClient {
    /// Create a login client.
    pub fn new(config: LoginConfig) -> Result<Self, LineError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(LineError::Http)?;

        Ok(Self { http, config })
    }

    /// Build an authorization URL with a fresh `state` and `nonce`.
    ///
    /// The caller is responsible for remembering `state` if it wants to
    /// check it on callback.
    pub fn authorization_request(&self) -> Result<AuthorizationRequest, LineError> {
        let state = random_string(STATE_LENGTH);
        let nonce = random_string(STATE_LENGTH);

        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.channel_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state.as_str()),
                ("scope", LOGIN_SCOPE),
                ("nonce", nonce.as_str()),
            ],
        )
        .map_err(|e| LineError::Config(format!("invalid authorize URL: {}", e)))?;

        Ok(AuthorizationRequest {
            auth_url: url.into(),
            state,
            nonce,
        })
    }

    /// Exchange an authorization code and fetch the user's profile.
    pub async fn complete(&self, code: &str) -> Result<LoginProfile, LineError> {
        let token = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&token.access_token).await?;

        Ok(LoginProfile {
            user_id: profile.user_id,
            display_name: profile.display_name,
            picture_url: profile.picture_url,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, LineError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.channel_id.as_str()),
            ("client_secret", self.config.channel_secret.expose_secret()),
        ];

        debug!(url = %self.config.token_url(), "Exchanging LINE authorization code");

        let response = self
            .http
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| LineError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "LINE token exchange failed");
            return Err(LineError::TokenExchange(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| LineError::TokenExchange(e.to_string()))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileResponse, LineError> {
        let response = self
            .http
            .get(self.config.profile_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LineError::Profile(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "LINE profile request failed");
            return Err(LineError::Profile(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| LineError::Profile(e.to_string()))
    }

    /// Get the configuration.
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }
}

impl std::fmt::Debug for LoginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginClient")
            .field("channel_id", &self.config.channel_id)
            .field("redirect_uri", &self.config.redirect_uri)
            .finish()
    }
}

/// Random ASCII alphanumeric string.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LoginClient {
        let config = LoginConfig::new("1234567890", "secret", "http://localhost:3000/api/line-login-callback");
        LoginClient::new(config).unwrap()
    }

    #[test]
    fn test_random_string_shape() {
        let value = random_string(STATE_LENGTH);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(value, random_string(STATE_LENGTH));
    }

    #[test]
    fn test_authorization_request() {
        let request = client().authorization_request().unwrap();
        let url = Url::parse(&request.auth_url).unwrap();

        assert_eq!(url.host_str(), Some("access.line.me"));
        assert_eq!(url.path(), "/oauth2/v2.1/authorize");

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "1234567890");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/api/line-login-callback");
        assert_eq!(params["scope"], "profile openid");
        assert_eq!(params["state"], request.state);
        assert_eq!(params["nonce"], request.nonce);
        assert_ne!(request.state, request.nonce);
    }
}
