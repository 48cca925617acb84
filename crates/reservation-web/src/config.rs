//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use constant_time_eq::constant_time_eq;
use secrecy::{ExposeSecret, SecretString};

/// Capacity used when `EVENT_CAPACITY` is unset.
pub const DEFAULT_CAPACITY: i64 = 20;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// LINE Messaging API and LINE Login settings.
#[derive(Debug, Clone, Default)]
pub struct LineSettings {
    pub channel_access_token: Option<SecretString>,
    pub channel_secret: Option<SecretString>,
    pub channel_id: Option<String>,
    /// Explicit `LINE_LOGIN_REDIRECT_URI`, if set.
    pub login_redirect_uri: Option<String>,
    /// Reject login callbacks whose state does not match the cookie.
    pub verify_login_state: bool,
}

/// SMTP settings; present only when `SMTP_HOST` and `MAIL_FROM` are set.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

/// Reservation server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Maximum number of confirmed reservations.
    pub capacity: i64,
    pub environment: Environment,
    /// Public site URL used in links and redirects, without trailing slash.
    pub public_base_url: String,
    /// Directory with the static site.
    pub static_dir: PathBuf,
    pub admin_password: Option<SecretString>,
    pub line: LineSettings,
    pub smtp: Option<SmtpSettings>,
    /// Send a confirmation email when a reservation is created.
    pub send_confirmation_email: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BIND_ADDR` | Server bind address | `127.0.0.1:3000` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:reservations.db?mode=rwc` |
    /// | `EVENT_CAPACITY` | Confirmed reservation limit | `20` |
    /// | `APP_ENV` | `production` or `development` | `development` |
    /// | `PUBLIC_BASE_URL` | Public site URL | `http://localhost:3000` |
    /// | `STATIC_DIR` | Static site directory | `public` |
    /// | `ADMIN_PASSWORD` | Admin page password | (unset) |
    /// | `LINE_CHANNEL_ACCESS_TOKEN` | Messaging API token | (unset) |
    /// | `LINE_CHANNEL_SECRET` | Channel secret | (unset) |
    /// | `LINE_CHANNEL_ID` | LINE Login channel ID | (unset) |
    /// | `LINE_LOGIN_REDIRECT_URI` | Login callback URL | `<PUBLIC_BASE_URL>/api/line-login-callback` |
    /// | `LINE_LOGIN_VERIFY_STATE` | Enforce login state check | `false` |
    /// | `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM` | Email | (unset), port `587` |
    /// | `SEND_CONFIRMATION_EMAIL` | Email on create | `false` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let addr = get("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| "sqlite:reservations.db?mode=rwc".to_string());

        let capacity = match get("EVENT_CAPACITY") {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|c| *c >= 0)
                .ok_or_else(|| ConfigError::Invalid("EVENT_CAPACITY", value))?,
            None => DEFAULT_CAPACITY,
        };

        let environment = match get("APP_ENV").as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let static_dir = PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "public".to_string()));

        let line = LineSettings {
            channel_access_token: get("LINE_CHANNEL_ACCESS_TOKEN").map(SecretString::from),
            channel_secret: get("LINE_CHANNEL_SECRET").map(SecretString::from),
            channel_id: get("LINE_CHANNEL_ID"),
            login_redirect_uri: get("LINE_LOGIN_REDIRECT_URI"),
            verify_login_state: parse_bool("LINE_LOGIN_VERIFY_STATE", get("LINE_LOGIN_VERIFY_STATE"))?,
        };

        let smtp = match (get("SMTP_HOST"), get("MAIL_FROM")) {
            (Some(host), Some(from)) => {
                let port = match get("SMTP_PORT") {
                    Some(value) => value
                        .parse::<u16>()
                        .map_err(|_| ConfigError::Invalid("SMTP_PORT", value))?,
                    None => mailer::DEFAULT_SMTP_PORT,
                };
                Some(SmtpSettings {
                    host,
                    port,
                    username: get("SMTP_USERNAME").unwrap_or_default(),
                    password: SecretString::from(get("SMTP_PASSWORD").unwrap_or_default()),
                    from,
                })
            }
            _ => None,
        };

        Ok(Self {
            addr,
            database_url,
            capacity,
            environment,
            public_base_url,
            static_dir,
            admin_password: get("ADMIN_PASSWORD").map(SecretString::from),
            line,
            smtp,
            send_confirmation_email: parse_bool(
                "SEND_CONFIRMATION_EMAIL",
                get("SEND_CONFIRMATION_EMAIL"),
            )?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// LINE Login callback URL.
    pub fn login_redirect_uri(&self) -> String {
        self.line
            .login_redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/api/line-login-callback", self.public_base_url))
    }

    /// Compare a submitted admin password with the configured one.
    ///
    /// Returns `None` when no password is configured.
    pub fn check_admin_password(&self, candidate: &str) -> Option<bool> {
        self.admin_password
            .as_ref()
            .map(|expected| constant_time_eq(expected.expose_secret().as_bytes(), candidate.as_bytes()))
    }
}

fn parse_bool(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(_) => Err(ConfigError::Invalid(var, value.unwrap_or_default())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid BIND_ADDR format")]
    InvalidAddr,

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.database_url, "sqlite:reservations.db?mode=rwc");
        assert_eq!(config.capacity, 20);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.login_redirect_uri(), "http://localhost:3000/api/line-login-callback");
        assert!(config.admin_password.is_none());
        assert!(config.smtp.is_none());
        assert!(!config.line.verify_login_state);
        assert!(!config.send_confirmation_email);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("EVENT_CAPACITY", "5"),
            ("APP_ENV", "production"),
            ("PUBLIC_BASE_URL", "https://lunch.example.com/"),
            ("LINE_LOGIN_VERIFY_STATE", "true"),
            ("SMTP_HOST", "smtp.example.com"),
            ("MAIL_FROM", "Minato Lunch <noreply@example.com>"),
        ])
        .unwrap();

        assert_eq!(config.capacity, 5);
        assert!(config.is_production());
        assert_eq!(config.public_base_url, "https://lunch.example.com");
        assert_eq!(config.login_redirect_uri(), "https://lunch.example.com/api/line-login-callback");
        assert!(config.line.verify_login_state);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("EVENT_CAPACITY", "lots")]),
            Err(ConfigError::Invalid("EVENT_CAPACITY", _))
        ));
        assert!(matches!(config(&[("BIND_ADDR", "nowhere")]), Err(ConfigError::InvalidAddr)));
        assert!(matches!(
            config(&[("SEND_CONFIRMATION_EMAIL", "maybe")]),
            Err(ConfigError::Invalid("SEND_CONFIRMATION_EMAIL", _))
        ));
    }

    #[test]
    fn test_admin_password_check() {
        assert_eq!(config(&[]).unwrap().check_admin_password("x"), None);

        let config = config(&[("ADMIN_PASSWORD", "s3cret")]).unwrap();
        assert_eq!(config.check_admin_password("s3cret"), Some(true));
        assert_eq!(config.check_admin_password("s3cre"), Some(false));
        assert_eq!(config.check_admin_password("S3cret"), Some(false));
    }
}
