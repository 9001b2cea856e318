//! Order models.

use chrono::{DateTime, Utc};
use jabuticaba_core::{AddressId, CustomerId, OrderId, OrderItemId, OrderStatus, TaxId, ZoneId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical parcel data for one cart line, as the carrier expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Weight in kilograms.
    pub weight_kg: Decimal,
    /// Length in centimeters.
    pub length_cm: Decimal,
    /// Width in centimeters.
    pub width_cm: Decimal,
    /// Height in centimeters.
    pub height_cm: Decimal,
    /// How many identical parcels.
    pub quantity: u32,
    /// Declared value for carrier insurance.
    pub insurance_value: Decimal,
}

/// Everything the provisioner needs to create a carrier shipment later,
/// captured at checkout time.
///
/// Provisioning runs in a separate process invocation that no longer has
/// access to the checkout session, so the selection is stored on the order
/// in its own typed column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierSelection {
    /// Carrier company name at selection time.
    pub carrier_name: String,
    /// Service name at selection time. Together with `carrier_name` this
    /// re-identifies the service at provisioning time; the numeric service
    /// ID is deliberately not stored because it is not stable.
    pub service_name: String,
    /// Quoted price the customer accepted.
    pub price: Decimal,
    /// Per-line parcel data.
    pub parcels: Vec<Parcel>,
    /// Recipient CPF, mandatory for carrier shipments.
    pub recipient_tax_id: TaxId,
}

/// How an order is to be delivered.
///
/// A typed column, not free text: an order is unambiguously one variant
/// and nothing ever has to parse-and-guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ShippingMethod {
    /// Locally operated delivery, priced by zone.
    LastMile {
        /// The matched zone the customer selected.
        zone_id: ZoneId,
    },
    /// Third-party carrier shipment.
    Carrier(CarrierSelection),
}

impl ShippingMethod {
    /// Whether this order needs a carrier shipment provisioned.
    #[must_use]
    pub const fn is_carrier(&self) -> bool {
        matches!(self, Self::Carrier(_))
    }
}

/// Identifiers returned by the carrier when a shipment is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentInfo {
    /// Carrier shipment identifier; its presence on an order is the
    /// idempotency marker for provisioning.
    pub shipment_id: String,
    /// Carrier protocol code for customer-service lookups.
    pub protocol: String,
}

/// A persisted order.
///
/// `total = subtotal - discount + shipping` holds at creation time and is
/// never recomputed. After creation only `status`, `tracking_code` and the
/// shipment identifiers change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Sum of line totals before discount and shipping.
    pub subtotal: Decimal,
    /// Coupon/promotion discount.
    pub discount: Decimal,
    /// Shipping charged, after any free-delivery threshold.
    pub shipping: Decimal,
    /// Final amount charged.
    pub total: Decimal,
    /// Destination address.
    pub shipping_address_id: AddressId,
    /// Delivery method chosen at checkout.
    pub shipping_method: ShippingMethod,
    /// Free-text customer notes. Human text only.
    pub notes: Option<String>,
    /// Set once by the provisioner; never cleared.
    pub carrier_shipment_id: Option<String>,
    /// Carrier protocol code, set together with the shipment ID.
    pub carrier_protocol: Option<String>,
    /// Tracking code, set by an operator once the carrier emits one.
    pub tracking_code: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The identifiers persisted by a previous provisioning run, if any.
    #[must_use]
    pub fn shipment_info(&self) -> Option<ShipmentInfo> {
        match (&self.carrier_shipment_id, &self.carrier_protocol) {
            (Some(shipment_id), Some(protocol)) => Some(ShipmentInfo {
                shipment_id: shipment_id.clone(),
                protocol: protocol.clone(),
            }),
            _ => None,
        }
    }
}

/// An order waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Sum of line totals before discount and shipping.
    pub subtotal: Decimal,
    /// Coupon/promotion discount.
    pub discount: Decimal,
    /// Shipping charged.
    pub shipping: Decimal,
    /// Final amount charged.
    pub total: Decimal,
    /// Destination address.
    pub shipping_address_id: AddressId,
    /// Delivery method chosen at checkout.
    pub shipping_method: ShippingMethod,
    /// Free-text customer notes.
    pub notes: Option<String>,
}

/// An immutable snapshot of one purchased line.
///
/// Deliberately denormalized: catalog edits never retroactively alter
/// historical orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item ID.
    pub id: OrderItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// Product name at purchase time.
    pub product_name: String,
    /// Unit price at purchase time.
    pub unit_price: Decimal,
    /// Units purchased.
    pub quantity: u32,
    /// Size variant, if any.
    pub size: Option<String>,
    /// Color variant, if any.
    pub color: Option<String>,
}

/// An order line waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    /// Product name at purchase time.
    pub product_name: String,
    /// Unit price at purchase time.
    pub unit_price: Decimal,
    /// Units purchased.
    pub quantity: u32,
    /// Size variant, if any.
    pub size: Option<String>,
    /// Color variant, if any.
    pub color: Option<String>,
}

impl NewOrderItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
