use crate::client::error::ApiError;
use crate::client::tokens::TokenStore;
use crate::client::types::{
    BookingDetail, BookingRecord, RefreshRequest, RefreshResponse, TokenPair, VerificationResult,
    VerifyRequest,
};
use crate::client::BookingApi;
use crate::config::ApiConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `reqwest`-backed booking API client with bearer auth and refresh-on-401
pub struct ApiClient {
    http_client: Client,
    config: ApiConfig,
    tokens: Option<Arc<TokenStore>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, tokens: Option<Arc<TokenStore>>) -> Result<Self, ApiError> {
        // Create HTTP client with timeouts
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(ApiClient {
            http_client,
            config,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, ApiError> {
        let base = self.config.base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ApiError::Url(format!("unsupported base URL: {}", self.config.base_url)));
        }

        if path.starts_with('/') {
            Ok(format!("{}{}", base, path))
        } else {
            Ok(format!("{}/{}", base, path))
        }
    }

    fn booking_url(&self, booking_id: u64) -> Result<String, ApiError> {
        let path = self.config.booking_path.replace("{id}", &booking_id.to_string());
        self.endpoint(&path)
    }

    fn load_tokens(&self) -> Result<Option<TokenPair>, ApiError> {
        match &self.tokens {
            Some(store) => store.load().map_err(|e| ApiError::Storage(format!("{:#}", e))),
            None => Ok(None),
        }
    }

    fn clear_tokens(&self) {
        if let Some(store) = &self.tokens {
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to clear token store");
            }
        }
    }

    /// Send a request with the stored access token. On 401 the access token is
    /// refreshed once and the request replayed once.
    async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let tokens = self.load_tokens()?;

        let mut request = build(&self.http_client);
        if let Some(pair) = &tokens {
            request = request.bearer_auth(&pair.access);
        }

        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(pair) = tokens else {
            return Err(ApiError::Unauthorized);
        };

        debug!("Access token rejected, refreshing");

        let access = match self.refresh_access(&pair).await {
            Ok(access) => access,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.clear_tokens();
                return Err(ApiError::Unauthorized);
            }
        };

        let response = build(&self.http_client).bearer_auth(access).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Request rejected after token refresh, clearing session");
            self.clear_tokens();
            return Err(ApiError::Unauthorized);
        }

        Ok(response)
    }

    async fn refresh_access(&self, pair: &TokenPair) -> Result<String, ApiError> {
        let url = self.endpoint(&self.config.refresh_path)?;

        let response = self
            .http_client
            .post(&url)
            .json(&RefreshRequest {
                refresh: &pair.refresh,
            })
            .send()
            .await?;

        let refreshed: RefreshResponse = decode(response).await?;

        if let Some(store) = &self.tokens {
            store
                .update_access(&refreshed.access, refreshed.refresh.as_deref())
                .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        }

        info!("Access token refreshed");
        Ok(refreshed.access)
    }
}

/// Reject non-2xx responses, then decode the JSON body
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl BookingApi for ApiClient {
    async fn get_booking(&self, booking_id: u64) -> Result<BookingDetail, ApiError> {
        let url = self.booking_url(booking_id)?;
        debug!(booking_id, url = %url, "Fetching booking detail");

        let response = self.send(|client| client.get(&url)).await?;
        decode(response).await
    }

    async fn verify_payment(&self, booking_id: u64) -> Result<VerificationResult, ApiError> {
        let url = self.endpoint(&self.config.verify_path)?;
        let body = VerifyRequest {
            booking_id: booking_id.to_string(),
        };
        debug!(booking_id, url = %url, "Requesting manual payment verification");

        let response = self.send(|client| client.post(&url).json(&body)).await?;
        decode(response).await
    }

    async fn list_bookings(&self) -> Result<Vec<BookingRecord>, ApiError> {
        let url = self.endpoint(&self.config.list_path)?;
        debug!(url = %url, "Fetching booking list");

        let response = self.send(|client| client.get(&url)).await?;
        decode(response).await
    }
}
