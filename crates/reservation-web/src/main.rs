//! Reservation server for the Minato Lunch event.
//!
//! Serves the JSON API, the LINE webhook and the static site.

mod config;
mod emails;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use database::Database;
use line_client::{LineClient, LineConfig, LoginClient, LoginConfig};
use mailer::{Mailer, SmtpConfig, SmtpMailer};
use notifier::{EventDetails, Notifier, SkipReason};
use secrecy::ExposeSecret;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        addr = %config.addr,
        environment = config.environment.as_str(),
        capacity = config.capacity,
        "Starting reservation server"
    );

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let event = EventDetails::default().with_base_url(config.public_base_url.clone());
    let notifier = build_notifier(&config, event)?;
    let login = build_login(&config)?;
    let mailer = build_mailer(&config);

    // Build application state
    let addr = config.addr;
    let state = AppState::new(db, notifier, login, mailer, config);
    let app = routes::app(state);

    // Start server
    info!(addr = %addr, "Reservation server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Messaging API client, or a notifier that skips every delivery.
fn build_notifier(config: &Config, event: EventDetails) -> Result<Notifier, line_client::LineError> {
    let line = &config.line;
    match (&line.channel_access_token, &line.channel_secret) {
        (Some(token), Some(secret)) => {
            let client = LineClient::new(LineConfig::new(token.expose_secret(), secret.expose_secret()))?;
            Ok(Notifier::new(Arc::new(client), event))
        }
        (None, _) => {
            warn!("LINE_CHANNEL_ACCESS_TOKEN not set, LINE notifications disabled");
            Ok(Notifier::unconfigured(SkipReason::MissingAccessToken, event))
        }
        (Some(_), None) => {
            warn!("LINE_CHANNEL_SECRET not set, LINE notifications disabled");
            Ok(Notifier::unconfigured(SkipReason::MissingChannelSecret, event))
        }
    }
}

fn build_login(config: &Config) -> Result<Option<LoginClient>, line_client::LineError> {
    let (Some(channel_id), Some(secret)) = (&config.line.channel_id, &config.line.channel_secret) else {
        info!("LINE Login not configured");
        return Ok(None);
    };

    let login_config = LoginConfig::new(
        channel_id.as_str(),
        secret.expose_secret(),
        config.login_redirect_uri(),
    );
    Ok(Some(LoginClient::new(login_config)?))
}

/// SMTP mailer; a broken relay setup disables email instead of stopping the server.
fn build_mailer(config: &Config) -> Option<Arc<dyn Mailer>> {
    let Some(smtp) = config.smtp.as_ref() else {
        info!("SMTP not configured, emails disabled");
        return None;
    };

    let smtp_config = SmtpConfig::new(
        smtp.host.as_str(),
        smtp.username.as_str(),
        smtp.password.expose_secret(),
        smtp.from.as_str(),
    )
    .with_port(smtp.port);

    match SmtpMailer::new(smtp_config) {
        Ok(mailer) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP mailer ready");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            warn!(error = %e, "Invalid SMTP settings, emails disabled");
            None
        }
    }
}
