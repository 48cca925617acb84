use async_trait::async_trait;
use lettre::{
    message::{MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};

use crate::{Email, MailError, Mailer, Result, SmtpConfig};

/// Mailer backed by an SMTP relay.
///
/// Uses connection pooling for efficient batch sending.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new mailer with the given configuration.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password().to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(creds)
            .build();

        info!(
            host = %config.host,
            port = config.port,
            username = %config.username,
            "Created SMTP mailer"
        );

        Ok(Self {
            transport,
            from_address: config.from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: &Email) -> Result<()> {
        let message = build_message(&self.from_address, email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        info!(to = %email.to, "Email sent successfully");
        Ok(())
    }
}

/// Build a lettre Message from our Email type.
pub(crate) fn build_message(from: &str, email: &Email) -> Result<Message> {
    let from = from
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("From: {}", e)))?;
    let to = email
        .to
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("To '{}': {}", email.to, e)))?;

    let builder = Message::builder().from(from).to(to).subject(&email.subject);

    let message = if let Some(html) = &email.html_body {
        // Multipart alternative: text + HTML
        builder.multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(email.body.clone()))
                .singlepart(SinglePart::html(html.clone())),
        )
    } else {
        builder.body(email.body.clone())
    };

    message.map_err(|e| MailError::BuildEmail(e.to_string()))
}
