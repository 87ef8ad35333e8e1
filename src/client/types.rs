use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Booking detail as returned by `GET /bookings/{id}/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDetail {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl BookingDetail {
    pub fn with_status(status: &str) -> Self {
        BookingDetail {
            status: Some(status.to_string()),
            rest: Map::new(),
        }
    }
}

/// Response of `POST /bookings/payments/verify/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl VerificationResult {
    pub fn with_status(status: &str) -> Self {
        VerificationResult {
            status: Some(status.to_string()),
            rest: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub booking_id: String,
}

/// Entry of the booking list endpoint. Only the fields the client reads are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Bearer token pair kept in client storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

// A status that is missing, null or not a string is tolerated as absent
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}
