//! Carrier HTTP client.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::types::{RateRequest, ShipmentCreated, ShipmentRequest};
use super::{CarrierApi, CarrierError};
use crate::models::FreightOffer;

/// Request timeout for carrier calls. A timeout surfaces on the same
/// retryable path as a carrier-side error.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Carrier REST API client.
#[derive(Clone)]
pub struct CarrierClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: SecretString,
}

impl std::fmt::Debug for CarrierClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Rate response line as the carrier returns it.
#[derive(Debug, Deserialize)]
struct RateOfferResponse {
    id: i64,
    company: String,
    name: String,
    price: rust_decimal::Decimal,
    delivery_time: u32,
}

/// Error body shape shared by carrier endpoints.
#[derive(Debug, Deserialize)]
struct CarrierErrorResponse {
    message: String,
}

impl CarrierClient {
    /// Create a new carrier client.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, api_token: SecretString) -> Result<Self, CarrierError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CarrierError> {
        self.base_url
            .join(path)
            .map_err(|e| CarrierError::Decode(format!("invalid carrier URL {path}: {e}")))
    }

    /// Read the response body, mapping non-success statuses to
    /// [`CarrierError::Api`] with the carrier's message intact.
    async fn read_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CarrierError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CarrierErrorResponse>(&body)
                .map_or(body, |e| e.message);
            return Err(CarrierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Err(CarrierError::Decode("empty carrier response".to_owned()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CarrierError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CarrierApi for CarrierClient {
    #[instrument(skip(self, request), fields(destination = %request.destination_postal_code))]
    async fn calculate_rates(
        &self,
        request: &RateRequest,
    ) -> Result<Vec<FreightOffer>, CarrierError> {
        let response = self
            .client
            .post(self.endpoint("v1/rates")?)
            .bearer_auth(self.api_token.expose_secret())
            .json(request)
            .send()
            .await?;

        let offers: Vec<RateOfferResponse> = Self::read_response(response).await?;

        Ok(offers
            .into_iter()
            .map(|o| FreightOffer {
                service_id: o.id,
                carrier_name: o.company,
                service_name: o.name,
                price: o.price,
                delivery_days: o.delivery_time,
            })
            .collect())
    }

    #[instrument(skip(self, request), fields(service_id = request.service_id))]
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentCreated, CarrierError> {
        let response = self
            .client
            .post(self.endpoint("v1/shipments")?)
            .bearer_auth(self.api_token.expose_secret())
            .json(request)
            .send()
            .await?;

        Self::read_response(response).await
    }
}
