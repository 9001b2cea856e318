//! Domain models for the fulfillment core.

pub mod address;
pub mod delivery;
pub mod notification;
pub mod order;

pub use address::{Address, OriginAddress};
pub use delivery::{DeliverySettings, DeliveryZone, FreightOffer, FreightQuote};
pub use notification::{CustomerContact, NotificationRecord, OrderSummary};
pub use order::{
    CarrierSelection, NewOrder, NewOrderItem, Order, OrderItem, Parcel, ShipmentInfo,
    ShippingMethod,
};
