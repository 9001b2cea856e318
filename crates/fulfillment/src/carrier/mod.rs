//! Carrier API integration.
//!
//! This module provides:
//! - [`CarrierApi`] - the abstract rate-quote / shipment-creation contract
//! - [`CarrierClient`] - the HTTP implementation
//! - Wire types for rate and shipment requests
//!
//! Error handling follows one rule everywhere: the carrier's own message
//! is preserved verbatim, because operators diagnose rejected shipments
//! from it.

mod client;
mod types;

pub use client::CarrierClient;
pub use types::{RateRequest, ShipmentCreated, ShipmentParty, ShipmentRequest};

use async_trait::async_trait;

use crate::models::FreightOffer;

/// Errors that can occur when talking to the carrier.
#[derive(Debug, thiserror::Error)]
pub enum CarrierError {
    /// Network failure or timeout.
    #[error("carrier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The carrier rejected the request.
    #[error("carrier API error ({status}): {message}")]
    Api {
        /// HTTP status returned by the carrier.
        status: u16,
        /// Carrier error body, verbatim.
        message: String,
    },

    /// The carrier returned something we could not decode.
    #[error("carrier returned malformed response: {0}")]
    Decode(String),
}

impl CarrierError {
    /// All carrier failures are retryable from the caller's point of view;
    /// timeouts and provider rejections share the same retry path.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        true
    }

    /// The provider-side message, for operator-visible error reporting.
    #[must_use]
    pub fn provider_message(&self) -> String {
        match self {
            Self::Http(e) => e.to_string(),
            Self::Api { message, .. } => message.clone(),
            Self::Decode(msg) => msg.clone(),
        }
    }
}

/// Abstract carrier contract: quote rates, create shipments.
///
/// The checkout flow and the provisioner depend on this trait, not on the
/// HTTP client, so both are testable against fakes.
#[async_trait]
pub trait CarrierApi: Send + Sync {
    /// Price shipping options for a parcel set and destination.
    ///
    /// Zero offers is a valid outcome (no service covers the postal code).
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError`] on network failure, timeout, or a
    /// carrier-side rejection.
    async fn calculate_rates(&self, request: &RateRequest) -> Result<Vec<FreightOffer>, CarrierError>;

    /// Create a shipment and return the carrier's identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError`] on network failure, timeout, or a
    /// carrier-side rejection.
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentCreated, CarrierError>;
}
