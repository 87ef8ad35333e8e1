use crate::client::BookingApi;
use crate::reconcile::outcome::{Notification, Severity};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Receives the single terminal notification of a reconciliation session
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);

    /// Called once after a confirmed payment, so the caller can refetch its bookings
    async fn refresh_bookings(&self) {}
}

/// Writes notifications to the log, at a level matching their severity
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, n: &Notification) {
        match n.severity {
            Severity::Success => info!(
                booking_id = n.booking_id,
                severity = n.severity.as_str(),
                "{}: {}",
                n.title,
                n.message
            ),
            Severity::Warning => warn!(
                booking_id = n.booking_id,
                severity = n.severity.as_str(),
                "{}: {}",
                n.title,
                n.message
            ),
            Severity::Error => error!(
                booking_id = n.booking_id,
                severity = n.severity.as_str(),
                "{}: {}",
                n.title,
                n.message
            ),
        }
    }
}

/// Delegates notifications and answers refresh requests by refetching the booking list
pub struct RefreshingNotifier<N> {
    inner: N,
    api: Arc<dyn BookingApi>,
}

impl<N: Notifier> RefreshingNotifier<N> {
    pub fn new(inner: N, api: Arc<dyn BookingApi>) -> Self {
        RefreshingNotifier { inner, api }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RefreshingNotifier<N> {
    async fn notify(&self, notification: &Notification) {
        self.inner.notify(notification).await;
    }

    async fn refresh_bookings(&self) {
        match self.api.list_bookings().await {
            Ok(bookings) => {
                info!(count = bookings.len(), "Booking list refreshed");
            }
            Err(e) => {
                // Refresh is best effort, the outcome has already been reported
                warn!(error = %e, "Failed to refresh booking list");
            }
        }
        self.inner.refresh_bookings().await;
    }
}
