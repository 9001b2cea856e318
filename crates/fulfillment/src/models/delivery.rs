//! Delivery zone and freight models.

use jabuticaba_core::{PostalCode, ZoneId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A last-mile delivery zone configured by an operator.
///
/// Read-only to the checkout flow; zones are created and edited through
/// the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryZone {
    /// Zone ID.
    pub id: ZoneId,
    /// Operator-facing zone name (e.g. "Zona Sul").
    pub name: String,
    /// Neighborhood names covered by this zone. Compared after
    /// normalization, so casing/accents here don't matter.
    pub neighborhoods: Vec<String>,
    /// Flat delivery price for the zone.
    pub price: Decimal,
    /// Human-readable estimate shown at checkout (e.g. "em até 2 dias").
    pub estimated_time: String,
    /// Inactive zones are never offered.
    pub is_active: bool,
}

/// Singleton last-mile delivery settings.
///
/// Absence of the row implies the permissive defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    /// Master switch for the last-mile option.
    pub last_mile_enabled: bool,
    /// Minimum subtotal for last-mile delivery.
    pub minimum_order: Decimal,
    /// Subtotal at which last-mile delivery becomes free. Carrier shipping
    /// is never discounted by this threshold.
    pub free_delivery_threshold: Option<Decimal>,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            last_mile_enabled: true,
            minimum_order: Decimal::ZERO,
            free_delivery_threshold: None,
        }
    }
}

/// One priced shipping option returned by the carrier's rate API.
///
/// Transient by design: carrier pricing depends on the postal code and
/// cart weight and may change between calls, so offers are never cached
/// or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreightOffer {
    /// Carrier-internal service identifier. Valid only within the quote
    /// that returned it; provisioning re-resolves it.
    pub service_id: i64,
    /// Carrier company name (e.g. "Correios").
    pub carrier_name: String,
    /// Service name (e.g. "SEDEX").
    pub service_name: String,
    /// Quoted price.
    pub price: Decimal,
    /// Estimated delivery time in business days.
    pub delivery_days: u32,
}

/// The result of one freight calculation, tied to the postal code it was
/// quoted for.
///
/// An empty `offers` list is not an error: it means no carrier service
/// exists for that postal code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreightQuote {
    /// Destination postal code this quote was computed for. The checkout
    /// session discards quotes whose postal code it no longer matches.
    pub postal_code: PostalCode,
    /// Offers sorted by price ascending; the first is the default.
    pub offers: Vec<FreightOffer>,
}

impl FreightQuote {
    /// The cheapest offer, pre-selected as the default at checkout.
    #[must_use]
    pub fn cheapest(&self) -> Option<&FreightOffer> {
        self.offers.first()
    }

    /// Find an offer by its carrier service identifier.
    #[must_use]
    pub fn offer(&self, service_id: i64) -> Option<&FreightOffer> {
        self.offers.iter().find(|o| o.service_id == service_id)
    }
}
