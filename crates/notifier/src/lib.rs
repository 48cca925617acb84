//! Reservation notifications.
//!
//! This crate renders the message for a notification kind and pushes it to a
//! LINE user. Dispatch never fails: every outcome, including a skipped or
//! failed delivery, is returned as a [`DispatchOutcome`] for the caller to log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use line_client::{LineClient, LineConfig};
//! use notifier::{EventDetails, NotificationData, Notifier};
//!
//! # async fn example() -> Result<(), line_client::LineError> {
//! let client = LineClient::new(LineConfig::new("token", "secret"))?;
//! let notifier = Notifier::new(Arc::new(client), EventDetails::default());
//!
//! let data = NotificationData { name: "田中".to_string(), ..Default::default() };
//! let outcome = notifier.dispatch(Some("U4af4980629..."), "reservation_confirmed", &data).await;
//! println!("{}", serde_json::to_string(&outcome).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

mod render;

pub use render::{
    cancellation_message, confirmation_message, reminder_message, EventDetails, NotificationData,
};

use std::sync::Arc;

use async_trait::async_trait;
use line_client::{LineClient, LineError, Message};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

/// Delivers messages to LINE users.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Push messages to a user.
    async fn push(&self, to: &str, messages: &[Message]) -> Result<(), LineError>;

    /// Answer a webhook event with its reply token.
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), LineError>;
}

#[async_trait]
impl PushSender for LineClient {
    async fn push(&self, to: &str, messages: &[Message]) -> Result<(), LineError> {
        LineClient::push(self, to, messages).await
    }

    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), LineError> {
        LineClient::reply(self, reply_token, messages).await
    }
}

/// Kinds of notification the service sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ReservationConfirmed,
    ReservationCancelled,
    Reminder,
}

impl NotificationKind {
    /// Parse a wire name such as `reservation_confirmed`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "reservation_confirmed" => Some(Self::ReservationConfirmed),
            "reservation_cancelled" => Some(Self::ReservationCancelled),
            "reminder" => Some(Self::Reminder),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReservationConfirmed => "reservation_confirmed",
            Self::ReservationCancelled => "reservation_cancelled",
            Self::Reminder => "reminder",
        }
    }
}

/// Why a notification was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoUserId,
    MissingAccessToken,
    MissingChannelSecret,
    UnknownType,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoUserId => "no_user_id",
            Self::MissingAccessToken => "missing_access_token",
            Self::MissingChannelSecret => "missing_channel_secret",
            Self::UnknownType => "unknown_type",
        }
    }
}

/// Result of a dispatch attempt.
///
/// Serializes as `{"success":true}`, `{"success":false,"reason":..}` or
/// `{"success":false,"error":..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Skipped(SkipReason),
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

impl Serialize for DispatchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.is_sent() { 1 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("success", &self.is_sent())?;
        match self {
            Self::Sent => {}
            Self::Skipped(reason) => map.serialize_entry("reason", reason.as_str())?,
            Self::Failed(message) => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}

/// Renders and delivers reservation notifications.
#[derive(Clone)]
pub struct Notifier {
    sender: Result<Arc<dyn PushSender>, SkipReason>,
    event: EventDetails,
}

impl Notifier {
    /// Create a notifier that delivers through `sender`.
    pub fn new(sender: Arc<dyn PushSender>, event: EventDetails) -> Self {
        Self {
            sender: Ok(sender),
            event,
        }
    }

    /// Create a notifier whose deliveries are always skipped with `reason`.
    ///
    /// Used when messaging credentials are not configured.
    pub fn unconfigured(reason: SkipReason, event: EventDetails) -> Self {
        Self {
            sender: Err(reason),
            event,
        }
    }

    /// Event copy used for rendering.
    pub fn event(&self) -> &EventDetails {
        &self.event
    }

    /// Whether deliveries can be attempted at all.
    pub fn is_configured(&self) -> bool {
        self.sender.is_ok()
    }

    /// The underlying sender, for replies outside the notification kinds.
    pub fn sender(&self) -> Option<&Arc<dyn PushSender>> {
        self.sender.as_ref().ok()
    }

    /// Render the message for a notification kind.
    pub fn render(&self, kind: NotificationKind, data: &NotificationData) -> Message {
        match kind {
            NotificationKind::ReservationConfirmed => confirmation_message(&self.event, data),
            NotificationKind::ReservationCancelled => cancellation_message(&self.event, data),
            NotificationKind::Reminder => reminder_message(&self.event),
        }
    }

    /// Render and push a notification.
    ///
    /// Checks run in order: recipient, credentials, kind, delivery.
    pub async fn dispatch(
        &self,
        recipient: Option<&str>,
        kind: &str,
        data: &NotificationData,
    ) -> DispatchOutcome {
        let Some(recipient) = recipient.filter(|r| !r.trim().is_empty()) else {
            info!(kind = %kind, "No LINE user ID, skipping notification");
            return DispatchOutcome::Skipped(SkipReason::NoUserId);
        };

        let sender = match &self.sender {
            Ok(sender) => sender,
            Err(reason) => {
                warn!(reason = reason.as_str(), "LINE credentials not configured, skipping notification");
                return DispatchOutcome::Skipped(*reason);
            }
        };

        let Some(kind) = NotificationKind::parse(kind) else {
            warn!(kind = %kind, "Unknown notification type");
            return DispatchOutcome::Skipped(SkipReason::UnknownType);
        };

        let message = self.render(kind, data);
        match sender.push(recipient, &[message]).await {
            Ok(()) => {
                info!(recipient = %recipient, kind = kind.as_str(), "Notification sent");
                DispatchOutcome::Sent
            }
            Err(e) => {
                error!(recipient = %recipient, kind = kind.as_str(), error = %e, "Notification failed");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("configured", &self.is_configured())
            .field("event", &self.event.title)
            .finish()
    }
}
