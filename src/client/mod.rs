pub mod error;
pub mod http;
pub mod tokens;
pub mod types;

pub use error::ApiError;
pub use http::ApiClient;
pub use tokens::TokenStore;
pub use types::{BookingDetail, BookingRecord, TokenPair, VerificationResult};

use async_trait::async_trait;

/// Booking endpoints the reconciliation poller and its callers depend on
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// `GET /bookings/{id}/`
    async fn get_booking(&self, booking_id: u64) -> Result<BookingDetail, ApiError>;

    /// `POST /bookings/payments/verify/`
    async fn verify_payment(&self, booking_id: u64) -> Result<VerificationResult, ApiError>;

    /// `GET /bookings/view/`
    async fn list_bookings(&self) -> Result<Vec<BookingRecord>, ApiError>;
}
