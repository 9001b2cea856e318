//! Shipping address models.
//!
//! State and postal code are canonicalized at capture time (`StateCode`,
//! `PostalCode`), so everything downstream - zone matching, freight quotes,
//! shipment creation - works with known-good values instead of re-deriving
//! them from free text.

use jabuticaba_core::{AddressId, CustomerId, Phone, PostalCode, StateCode};
use serde::{Deserialize, Serialize};

/// A customer shipping address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Address ID.
    pub id: AddressId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Name of the person receiving the shipment.
    pub recipient_name: String,
    /// Street name.
    pub street: String,
    /// Street number.
    pub number: String,
    /// Apartment, suite, etc.
    pub complement: Option<String>,
    /// Neighborhood as the customer typed it (zone matching normalizes it).
    pub neighborhood: String,
    /// City.
    pub city: String,
    /// Canonical two-letter state code.
    pub state: StateCode,
    /// 8-digit CEP.
    pub postal_code: PostalCode,
    /// Contact phone; carriers require it, last-mile does not.
    pub phone: Option<Phone>,
}

/// The store's origin address, loaded from configuration.
///
/// Carriers require a complete, phone-bearing origin on every shipment, so
/// the fields here are all mandatory and validated at config load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginAddress {
    /// Store display name (appears on the shipping label).
    pub name: String,
    /// Store contact phone.
    pub phone: Phone,
    /// Street name.
    pub street: String,
    /// Street number.
    pub number: String,
    /// Neighborhood.
    pub neighborhood: String,
    /// City.
    pub city: String,
    /// Canonical two-letter state code.
    pub state: StateCode,
    /// 8-digit CEP.
    pub postal_code: PostalCode,
}
