//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use line_client::LoginClient;
use mailer::Mailer;
use notifier::Notifier;

use crate::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// LINE notification dispatcher, also used for webhook replies.
    pub notifier: Notifier,
    /// LINE Login client, absent without `LINE_CHANNEL_ID`/`LINE_CHANNEL_SECRET`.
    pub login: Option<LoginClient>,
    /// Email sender, absent without SMTP settings.
    pub mailer: Option<Arc<dyn Mailer>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        notifier: Notifier,
        login: Option<LoginClient>,
        mailer: Option<Arc<dyn Mailer>>,
        config: Config,
    ) -> Self {
        Self {
            db,
            notifier,
            login,
            mailer,
            config: Arc::new(config),
        }
    }
}
