//! Error types for the booking API client.

use thiserror::Error;

/// Errors raised while talking to the booking API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failure, timeout or unreadable body
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Access rejected and the refresh token could not renew it
    #[error("Not authorized, sign in again")]
    Unauthorized,

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Endpoint URL could not be built from the configured base
    #[error("Invalid endpoint URL: {0}")]
    Url(String),

    /// Token store failure
    #[error("Token store error: {0}")]
    Storage(String),
}
