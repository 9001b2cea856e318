//! Payment provider HTTP client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{CollectionHandle, CollectionRequest, PaymentError, PaymentProvider};

/// Request timeout for payment calls.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Payment provider REST client.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: SecretString,
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Error body shape returned by the provider.
#[derive(Debug, Deserialize)]
struct PaymentErrorResponse {
    message: String,
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, api_token: SecretString) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }
}

#[async_trait]
impl PaymentProvider for PaymentClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    async fn create_collection_handle(
        &self,
        request: &CollectionRequest,
    ) -> Result<CollectionHandle, PaymentError> {
        let url = self
            .base_url
            .join("v1/collections")
            .map_err(|e| PaymentError::Decode(format!("invalid payment URL: {e}")))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_token.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PaymentErrorResponse>(&body)
                .map_or(body, |e| e.message);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PaymentError::Decode(e.to_string()))
    }
}
