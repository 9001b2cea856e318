//! Payment provider integration.
//!
//! The checkout flow hands a persisted order to the payment provider and
//! gets back a collection handle (a hosted checkout URL). Nothing else
//! about payment lives in this core; confirmation arrives later as an
//! operational signal that triggers shipment provisioning.

mod client;

pub use client::PaymentClient;

use async_trait::async_trait;
use jabuticaba_core::OrderId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Network failure or timeout.
    #[error("payment request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("payment API error ({status}): {message}")]
    Api {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider error body, verbatim.
        message: String,
    },

    /// The provider returned something we could not decode.
    #[error("payment provider returned malformed response: {0}")]
    Decode(String),
}

impl PaymentError {
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

/// One line on the payment provider's receipt.
///
/// Shipping is passed as a synthetic line item so the receipt reflects the
/// real charge breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLineItem {
    /// Line title shown on the receipt.
    pub title: String,
    /// Units.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Decimal,
}

/// Where the provider sends the customer after checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectUrls {
    /// Landing page after successful payment.
    pub success: Url,
    /// Landing page after failed/abandoned payment.
    pub failure: Url,
}

/// A collection-handle request.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest {
    /// Order being paid for; the provider echoes it in webhooks.
    pub order_id: OrderId,
    /// Total amount to collect.
    pub amount: Decimal,
    /// Receipt lines, shipping included when charged.
    pub line_items: Vec<PaymentLineItem>,
    /// Post-checkout redirects.
    pub redirect_urls: RedirectUrls,
}

/// A payment-collection handle.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionHandle {
    /// Hosted checkout URL the customer is sent to.
    pub checkout_url: String,
}

/// Abstract payment provider contract.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Request a collection handle for a persisted order.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] on network failure, timeout, or a
    /// provider-side rejection. The order stays persisted either way.
    async fn create_collection_handle(
        &self,
        request: &CollectionRequest,
    ) -> Result<CollectionHandle, PaymentError>;
}
