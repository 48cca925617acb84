//! Database models.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a reservation.
///
/// The only permitted transition is `Confirmed -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Counts against the event capacity.
    Confirmed,
    /// Cancelled by the attendee; never reverts.
    Cancelled,
}

impl ReservationStatus {
    /// Stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored or user-supplied status value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "confirmed" => Some(ReservationStatus::Confirmed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attendee's signup for the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    /// Generated UUID, used as the external reference.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Affiliation (school, company, ...).
    pub affiliation: String,
    /// Free-text "current favorite".
    pub favorite: String,
    /// Lower-cased, trimmed email address.
    pub email: String,
    /// Current status.
    pub status: ReservationStatus,
    /// When the reservation was submitted.
    pub reservation_date: String,
    /// Row creation timestamp.
    pub created_at: String,
    /// Set once when the reservation is cancelled.
    pub cancelled_at: Option<String>,
    /// Linked LINE user ID for push notifications.
    pub line_user_id: Option<String>,
}

/// Input for creating a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewReservation {
    pub name: String,
    pub affiliation: String,
    pub favorite: String,
    pub email: String,
    pub line_user_id: Option<String>,
}

impl NewReservation {
    /// Trim free-text fields and lower-case the email.
    ///
    /// A blank LINE user ID is treated as absent.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            affiliation: self.affiliation.trim().to_string(),
            favorite: self.favorite.trim().to_string(),
            email: normalize_email(&self.email),
            line_user_id: self
                .line_user_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Aggregate counts over all reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationStats {
    pub total: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    /// `max(0, capacity - confirmed)`.
    pub remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_trims_and_lowercases() {
        let input = NewReservation {
            name: "  田中 ".to_string(),
            affiliation: "大学\n".to_string(),
            favorite: " 音楽".to_string(),
            email: " A@B.COM ".to_string(),
            line_user_id: Some("   ".to_string()),
        };

        let normalized = input.normalized();
        assert_eq!(normalized.name, "田中");
        assert_eq!(normalized.affiliation, "大学");
        assert_eq!(normalized.favorite, "音楽");
        assert_eq!(normalized.email, "a@b.com");
        assert_eq!(normalized.line_user_id, None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ReservationStatus::parse("confirmed"), Some(ReservationStatus::Confirmed));
        assert_eq!(ReservationStatus::parse(" Cancelled "), Some(ReservationStatus::Cancelled));
        assert_eq!(ReservationStatus::parse("all"), None);
        assert_eq!(ReservationStatus::Cancelled.to_string(), "cancelled");
    }
}
