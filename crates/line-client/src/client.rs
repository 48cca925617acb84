//! LINE Messaging API HTTP client.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, info};

use crate::config::LineConfig;
use crate::error::LineError;
use crate::types::{ApiErrorBody, Message, PushRequest, ReplyRequest};

/// Client for the LINE Messaging API.
#[derive(Clone)]
pub struct LineClient {
    http: Client,
    config: LineConfig,
}

impl LineClient {
    /// Create a client for the given channel.
    pub fn new(config: LineConfig) -> Result<Self, LineError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(LineError::Http)?;

        info!(api = %config.api_base_url, "Created LINE messaging client");

        Ok(Self { http, config })
    }

    /// Push messages to a user at any time.
    pub async fn push(&self, to: &str, messages: &[Message]) -> Result<(), LineError> {
        let url = self.config.push_url();
        debug!(recipient = %to, count = messages.len(), "Pushing LINE messages");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.access_token())
            .json(&PushRequest { to, messages })
            .send()
            .await?;

        check_status(response).await
    }

    /// Push a single text message.
    pub async fn push_text(&self, to: &str, text: &str) -> Result<(), LineError> {
        self.push(to, &[Message::text(text)]).await
    }

    /// Reply to a webhook event using its single-use reply token.
    pub async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), LineError> {
        let url = self.config.reply_url();
        debug!(count = messages.len(), "Replying with LINE messages");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.access_token())
            .json(&ReplyRequest {
                reply_token,
                messages,
            })
            .send()
            .await?;

        check_status(response).await
    }

    /// Reply with a single text message.
    pub async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        self.reply(reply_token, &[Message::text(text)]).await
    }

    /// Get the configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }
}

/// Turn a non-2xx response into [`LineError::Api`].
async fn check_status(response: Response) -> Result<(), LineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|err| err.message)
        .unwrap_or(body);

    Err(LineError::Api {
        status: status.as_u16(),
        message,
    })
}

impl std::fmt::Debug for LineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClient")
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}
