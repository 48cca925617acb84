use secrecy::{ExposeSecret, SecretString};

/// Default submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration for an SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP host
    pub host: String,
    /// SMTP port (default: 587)
    pub port: u16,
    /// Login username
    pub username: String,
    /// Login password
    password: SecretString,
    /// Sender mailbox, e.g. `Minato Lunch <noreply@example.com>`
    pub from: String,
}

impl SmtpConfig {
    /// Create a new configuration on the default port.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SMTP_PORT,
            username: username.into(),
            password: SecretString::from(password.into()),
            from: from.into(),
        }
    }

    /// Builder method to set SMTP port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the password (exposes the secret).
    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}
