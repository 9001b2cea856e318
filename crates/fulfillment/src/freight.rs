//! Freight aggregation.
//!
//! Wraps the carrier rate API into quotes the checkout flow can present:
//! offers sorted cheapest-first, tied to the postal code they were
//! computed for. Quotes are never cached; pricing depends on the postal
//! code and cart weight and may change between calls.

use jabuticaba_core::PostalCode;
use tracing::instrument;

use crate::carrier::{CarrierApi, CarrierError, RateRequest};
use crate::models::{FreightQuote, Parcel};

/// Errors that can occur while quoting freight.
#[derive(Debug, thiserror::Error)]
pub enum FreightError {
    /// The carrier could not be reached or rejected the call. Retryable;
    /// the raw provider message is kept for display.
    #[error("freight unavailable: {provider_message}")]
    Unavailable {
        /// Provider error text, verbatim.
        provider_message: String,
    },
}

impl From<CarrierError> for FreightError {
    fn from(e: CarrierError) -> Self {
        Self::Unavailable {
            provider_message: e.provider_message(),
        }
    }
}

/// Prices third-party shipping for a cart and ranks the offers.
#[derive(Debug, Clone)]
pub struct FreightAggregator<C> {
    carrier: C,
    origin_postal_code: PostalCode,
}

impl<C: CarrierApi> FreightAggregator<C> {
    /// Create an aggregator shipping from the given origin.
    #[must_use]
    pub const fn new(carrier: C, origin_postal_code: PostalCode) -> Self {
        Self {
            carrier,
            origin_postal_code,
        }
    }

    /// Quote freight for the given destination and parcels.
    ///
    /// Offers come back sorted by price ascending; the cheapest is the
    /// checkout default. An empty offer list means no carrier service
    /// covers the destination - that is a valid quote, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FreightError::Unavailable`] on any carrier failure.
    #[instrument(skip(self, parcels), fields(destination = %destination))]
    pub async fn quote(
        &self,
        destination: PostalCode,
        parcels: &[Parcel],
    ) -> Result<FreightQuote, FreightError> {
        let request = RateRequest {
            origin_postal_code: self.origin_postal_code.clone(),
            destination_postal_code: destination.clone(),
            parcels: parcels.to_vec(),
        };

        let mut offers = self.carrier.calculate_rates(&request).await?;
        offers.sort_by(|a, b| a.price.cmp(&b.price));

        Ok(FreightQuote {
            postal_code: destination,
            offers,
        })
    }
}
