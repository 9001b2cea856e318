//! Carrier API wire types.

use jabuticaba_core::PostalCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Address, OriginAddress, Parcel};

/// A rate-calculation request.
#[derive(Debug, Clone, Serialize)]
pub struct RateRequest {
    /// Origin CEP.
    pub origin_postal_code: PostalCode,
    /// Destination CEP.
    pub destination_postal_code: PostalCode,
    /// One entry per cart line.
    pub parcels: Vec<Parcel>,
}

/// One endpoint of a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentParty {
    /// Contact name.
    pub name: String,
    /// Contact phone digits.
    pub phone: String,
    /// CPF digits; required for the destination, absent for the origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    /// Street name.
    pub street: String,
    /// Street number.
    pub number: String,
    /// Apartment, suite, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    /// Neighborhood.
    pub neighborhood: String,
    /// City.
    pub city: String,
    /// Canonical two-letter state code; the carrier rejects anything else.
    pub state: String,
    /// CEP digits.
    pub postal_code: String,
}

impl ShipmentParty {
    /// Build the origin endpoint from the configured store address.
    #[must_use]
    pub fn from_origin(origin: &OriginAddress) -> Self {
        Self {
            name: origin.name.clone(),
            phone: origin.phone.digits().to_owned(),
            tax_id: None,
            street: origin.street.clone(),
            number: origin.number.clone(),
            complement: None,
            neighborhood: origin.neighborhood.clone(),
            city: origin.city.clone(),
            state: origin.state.as_str().to_owned(),
            postal_code: origin.postal_code.digits().to_owned(),
        }
    }

    /// Build the destination endpoint from a customer address.
    ///
    /// The phone and tax ID are passed separately because the provisioner
    /// validates their presence before getting here.
    #[must_use]
    pub fn from_destination(address: &Address, phone: &str, tax_id: &str) -> Self {
        Self {
            name: address.recipient_name.clone(),
            phone: phone.to_owned(),
            tax_id: Some(tax_id.to_owned()),
            street: address.street.clone(),
            number: address.number.clone(),
            complement: address.complement.clone(),
            neighborhood: address.neighborhood.clone(),
            city: address.city.clone(),
            state: address.state.as_str().to_owned(),
            postal_code: address.postal_code.digits().to_owned(),
        }
    }
}

/// A shipment-creation request.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentRequest {
    /// Carrier-internal service identifier, freshly re-resolved from a
    /// rate call. Never a stored value.
    pub service_id: i64,
    /// Ship-from endpoint.
    pub origin: ShipmentParty,
    /// Ship-to endpoint.
    pub destination: ShipmentParty,
    /// Parcel data, identical to what was quoted.
    pub parcels: Vec<Parcel>,
    /// Declared value for insurance.
    pub declared_value: Decimal,
}

/// Identifiers returned by the carrier for a created shipment.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentCreated {
    /// Carrier shipment identifier.
    pub shipment_id: String,
    /// Carrier protocol code.
    pub protocol: String,
}
