//! Outbound email for the reservation service.
//!
//! Sends plain text or text + HTML messages through an SMTP relay using
//! STARTTLS and login credentials.
//!
//! # Example
//!
//! ```no_run
//! use mailer::{Email, Mailer, SmtpConfig, SmtpMailer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailer::MailError> {
//!     let config = SmtpConfig::new("smtp.example.com", "user", "password", "noreply@example.com");
//!     let mailer = SmtpMailer::new(config)?;
//!
//!     let email = Email::new("recipient@example.com", "Hello", "Plain text body")
//!         .with_html("<p>HTML body</p>");
//!     mailer.send(&email).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::SmtpMailer;
pub use config::{SmtpConfig, DEFAULT_SMTP_PORT};
pub use error::{MailError, Result};
pub use types::Email;

use async_trait::async_trait;

/// Something that can deliver an [`Email`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &Email) -> Result<()>;
}
