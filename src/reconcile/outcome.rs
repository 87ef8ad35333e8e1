use serde::{Deserialize, Serialize};

/// Terminal result of a reconciliation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Confirmed,
    Failed,
    Cancelled,
    PollingError { reason: String },
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Confirmed => "confirmed",
            Outcome::Failed => "failed",
            Outcome::Cancelled => "cancelled",
            Outcome::PollingError { .. } => "polling_error",
        }
    }

    /// Whether the caller should refetch its booking list
    pub fn requires_refresh(&self) -> bool {
        matches!(self, Outcome::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// User-facing notification emitted once per resolved session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub booking_id: u64,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub refresh_bookings: bool,
}

impl Notification {
    pub fn for_outcome(booking_id: u64, outcome: &Outcome) -> Self {
        let (severity, title, message) = match outcome {
            Outcome::Confirmed => (
                Severity::Success,
                "Payment confirmed",
                format!("Booking #{} is confirmed. Enjoy your stay!", booking_id),
            ),
            Outcome::Failed => (
                Severity::Error,
                "Payment failed",
                format!(
                    "Payment for booking #{} failed. Please try again or use another payment method.",
                    booking_id
                ),
            ),
            Outcome::Cancelled => (
                Severity::Warning,
                "Booking cancelled",
                format!("Booking #{} was cancelled.", booking_id),
            ),
            Outcome::PollingError { .. } => (
                Severity::Error,
                "Status check failed",
                "We could not check your booking status. Please refresh your bookings later."
                    .to_string(),
            ),
        };

        Notification {
            booking_id,
            severity,
            title: title.to_string(),
            message,
            refresh_bookings: outcome.requires_refresh(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_severity_mapping() {
        let confirmed = Notification::for_outcome(42, &Outcome::Confirmed);
        assert_eq!(confirmed.severity, Severity::Success);
        assert!(confirmed.refresh_bookings);

        let failed = Notification::for_outcome(42, &Outcome::Failed);
        assert_eq!(failed.severity, Severity::Error);
        assert!(!failed.refresh_bookings);

        let cancelled = Notification::for_outcome(42, &Outcome::Cancelled);
        assert_eq!(cancelled.severity, Severity::Warning);
        assert!(!cancelled.refresh_bookings);
    }

    #[test]
    fn test_polling_error_message_is_generic() {
        let outcome = Outcome::PollingError {
            reason: "HTTP request failed: connection refused".to_string(),
        };
        let notification = Notification::for_outcome(9, &outcome);

        assert_eq!(notification.severity, Severity::Error);
        assert_eq!(notification.title, "Status check failed");
        assert!(!notification.message.contains("connection refused"));
        assert!(!notification.refresh_bookings);
    }
}
