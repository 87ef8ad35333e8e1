use crate::reconcile::outcome::Outcome;
use serde::{Deserialize, Serialize};

/// Booking status as reported by the booking detail endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Failed,
    Completed,
}

impl BookingStatus {
    /// Wire values are case-insensitive; unknown values yield `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "FAILED" => Some(BookingStatus::Failed),
            "COMPLETED" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Failed => "FAILED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Outcome this status settles a reconciliation session with, if any.
    /// `COMPLETED` seen mid-poll is not terminal here.
    pub fn terminal_outcome(&self) -> Option<Outcome> {
        match self {
            BookingStatus::Confirmed => Some(Outcome::Confirmed),
            BookingStatus::Failed => Some(Outcome::Failed),
            BookingStatus::Cancelled => Some(Outcome::Cancelled),
            BookingStatus::Pending | BookingStatus::Completed => None,
        }
    }
}

/// Status returned by the manual payment verification endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Paid,
    Failed,
    Other(String),
}

impl VerificationStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "paid" => VerificationStatus::Paid,
            "failed" => VerificationStatus::Failed,
            _ => VerificationStatus::Other(normalized),
        }
    }

    pub fn terminal_outcome(&self) -> Option<Outcome> {
        match self {
            VerificationStatus::Paid => Some(Outcome::Confirmed),
            VerificationStatus::Failed => Some(Outcome::Failed),
            VerificationStatus::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_is_case_insensitive() {
        assert_eq!(BookingStatus::parse("confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse(" Cancelled "), Some(BookingStatus::Cancelled));
        assert_eq!(BookingStatus::parse("PENDING"), Some(BookingStatus::Pending));
        assert_eq!(BookingStatus::parse("refunded"), None);
    }

    #[test]
    fn test_only_three_statuses_are_terminal() {
        assert_eq!(BookingStatus::Confirmed.terminal_outcome(), Some(Outcome::Confirmed));
        assert_eq!(BookingStatus::Failed.terminal_outcome(), Some(Outcome::Failed));
        assert_eq!(BookingStatus::Cancelled.terminal_outcome(), Some(Outcome::Cancelled));
        assert_eq!(BookingStatus::Pending.terminal_outcome(), None);
        assert_eq!(BookingStatus::Completed.terminal_outcome(), None);
    }

    #[test]
    fn test_verification_status_mapping() {
        assert_eq!(VerificationStatus::parse("paid").terminal_outcome(), Some(Outcome::Confirmed));
        assert_eq!(VerificationStatus::parse("FAILED").terminal_outcome(), Some(Outcome::Failed));

        let pending = VerificationStatus::parse("pending");
        assert_eq!(pending, VerificationStatus::Other("pending".to_string()));
        assert_eq!(pending.terminal_outcome(), None);
    }
}
