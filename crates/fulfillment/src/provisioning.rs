//! Shipment provisioning.
//!
//! Runs after payment confirmation and creates the carrier shipment for
//! an order, exactly once. Safe to re-invoke: a provisioned order is
//! detected by its stored shipment identifier, a non-carrier order is a
//! success no-op, and any hard failure leaves the order unmodified and
//! retryable once the root cause is fixed.

use jabuticaba_core::OrderId;
use tracing::instrument;

use crate::carrier::{CarrierApi, CarrierError, RateRequest, ShipmentParty, ShipmentRequest};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Address, CarrierSelection, Order, OriginAddress, ShipmentInfo};

/// Errors that can occur while provisioning a shipment.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// No such order.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Another provisioning attempt for this order is in flight.
    /// Retryable once it finishes.
    #[error("order {0} is already being provisioned")]
    InProgress(OrderId),

    /// A carrier-mandatory field is missing. Named so an operator can fix
    /// the data and retry.
    #[error("missing {field} for order {order_id}")]
    MissingField {
        /// The order being provisioned.
        order_id: OrderId,
        /// Carrier-mandatory field that is absent.
        field: &'static str,
    },

    /// The previously selected carrier service no longer exists for this
    /// route. The order keeps its selection; an operator decides how to
    /// proceed.
    #[error("carrier service {service:?} from {carrier:?} is no longer offered for this route")]
    ServiceNotOffered {
        /// Carrier name stored at checkout.
        carrier: String,
        /// Service name stored at checkout.
        service: String,
    },

    /// The carrier call failed; the provider message is preserved.
    #[error(transparent)]
    Carrier(#[from] CarrierError),

    /// Persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ProvisionError {
    /// Whether re-invoking provisioning can succeed without data changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InProgress(_) | Self::Carrier(_) | Self::Repository(_)
        )
    }
}

/// The result of one provisioning invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A shipment was created on this invocation.
    Provisioned(ShipmentInfo),
    /// A previous invocation already created the shipment; its stored
    /// identifiers are returned unchanged.
    AlreadyProvisioned(ShipmentInfo),
    /// Last-mile order: nothing to provision with a carrier.
    NotCarrierOrder,
}

/// Creates carrier shipments for paid orders, exactly once per order.
pub struct ShipmentProvisioner<O, C> {
    orders: O,
    carrier: C,
    origin: OriginAddress,
}

impl<O, C> ShipmentProvisioner<O, C>
where
    O: OrderStore,
    C: CarrierApi,
{
    /// Create a provisioner shipping from the given origin.
    pub const fn new(orders: O, carrier: C, origin: OriginAddress) -> Self {
        Self {
            orders,
            carrier,
            origin,
        }
    }

    /// Provision the shipment for an order.
    ///
    /// Idempotent under retries; see [`ProvisionOutcome`]. Provisioning
    /// for distinct orders may run concurrently, but attempts for the
    /// same order are serialized by a per-order lock, with the
    /// conditional shipment-identifier write as the commit guard.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] naming the offending field for invalid
    /// recipient data, or preserving the carrier's message for provider
    /// failures. The order is left unmodified on any error.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn provision(&self, order_id: OrderId) -> Result<ProvisionOutcome, ProvisionError> {
        if !self.orders.try_lock_order(order_id).await? {
            return Err(ProvisionError::InProgress(order_id));
        }

        let result = self.provision_locked(order_id).await;

        if let Err(e) = self.orders.unlock_order(order_id).await {
            tracing::warn!(order_id = %order_id, error = %e, "failed to release provisioning lock");
        }

        result
    }

    async fn provision_locked(
        &self,
        order_id: OrderId,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let order = match self.orders.order(order_id).await {
            Ok(order) => order,
            Err(RepositoryError::NotFound) => return Err(ProvisionError::OrderNotFound(order_id)),
            Err(e) => return Err(e.into()),
        };

        if let Some(info) = order.shipment_info() {
            tracing::info!(order_id = %order_id, shipment_id = %info.shipment_id, "order already provisioned");
            return Ok(ProvisionOutcome::AlreadyProvisioned(info));
        }

        let Some(selection) = carrier_selection(&order) else {
            tracing::info!(order_id = %order_id, "not a carrier order; nothing to provision");
            return Ok(ProvisionOutcome::NotCarrierOrder);
        };

        let destination = self.orders.shipping_address(order_id).await?;
        let recipient_phone = destination
            .phone
            .as_ref()
            .ok_or(ProvisionError::MissingField {
                order_id,
                field: "recipient phone",
            })?;

        let service_id = self.resolve_service_id(&destination, selection).await?;

        let request = ShipmentRequest {
            service_id,
            origin: ShipmentParty::from_origin(&self.origin),
            destination: ShipmentParty::from_destination(
                &destination,
                recipient_phone.digits(),
                selection.recipient_tax_id.digits(),
            ),
            parcels: selection.parcels.clone(),
            declared_value: order.total,
        };

        let created = self.carrier.create_shipment(&request).await?;
        let info = ShipmentInfo {
            shipment_id: created.shipment_id,
            protocol: created.protocol,
        };

        if self.orders.record_shipment(order_id, &info).await? {
            tracing::info!(order_id = %order_id, shipment_id = %info.shipment_id, "shipment provisioned");
            Ok(ProvisionOutcome::Provisioned(info))
        } else {
            // A concurrent attempt committed first; its identifiers win.
            let stored = self
                .orders
                .order(order_id)
                .await?
                .shipment_info()
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(
                        "shipment write lost without stored identifiers".to_owned(),
                    )
                })?;
            tracing::warn!(order_id = %order_id, "concurrent provisioning attempt won; keeping stored identifiers");
            Ok(ProvisionOutcome::AlreadyProvisioned(stored))
        }
    }

    /// Re-resolve the carrier's internal service identifier for the
    /// stored `(carrier, service)` pair. The identifier is not stable
    /// across quotes, so it is never stored at checkout time.
    async fn resolve_service_id(
        &self,
        destination: &Address,
        selection: &CarrierSelection,
    ) -> Result<i64, ProvisionError> {
        let request = RateRequest {
            origin_postal_code: self.origin.postal_code.clone(),
            destination_postal_code: destination.postal_code.clone(),
            parcels: selection.parcels.clone(),
        };

        let offers = self.carrier.calculate_rates(&request).await?;

        offers
            .iter()
            .find(|offer| {
                offer.carrier_name.eq_ignore_ascii_case(&selection.carrier_name)
                    && offer.service_name.eq_ignore_ascii_case(&selection.service_name)
            })
            .map(|offer| offer.service_id)
            .ok_or_else(|| ProvisionError::ServiceNotOffered {
                carrier: selection.carrier_name.clone(),
                service: selection.service_name.clone(),
            })
    }
}

/// The carrier selection carried by the order, if it is a carrier order.
///
/// A selection with an empty carrier name (legacy data from before the
/// typed column enforced one) is treated as non-carrier.
fn carrier_selection(order: &Order) -> Option<&CarrierSelection> {
    match &order.shipping_method {
        crate::models::ShippingMethod::Carrier(selection)
            if !selection.carrier_name.trim().is_empty() =>
        {
            Some(selection)
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Parcel, ShippingMethod};
    use crate::testing::{FakeCarrier, MemoryOrderStore, address_fixture, order_fixture};
    use jabuticaba_core::ZoneId;
    use rust_decimal::Decimal;

    fn origin() -> OriginAddress {
        OriginAddress {
            name: "Jabuticaba Modas".to_owned(),
            phone: "11912345678".parse().unwrap(),
            street: "Rua Augusta".to_owned(),
            number: "500".to_owned(),
            neighborhood: "Consolação".to_owned(),
            city: "São Paulo".to_owned(),
            state: "SP".parse().unwrap(),
            postal_code: "01304-000".parse().unwrap(),
        }
    }

    fn carrier_method() -> ShippingMethod {
        ShippingMethod::Carrier(CarrierSelection {
            carrier_name: "Correios".to_owned(),
            service_name: "SEDEX".to_owned(),
            price: Decimal::new(2_850, 2),
            parcels: vec![Parcel {
                weight_kg: Decimal::new(8, 1),
                length_cm: Decimal::from(30),
                width_cm: Decimal::from(20),
                height_cm: Decimal::from(10),
                quantity: 1,
                insurance_value: Decimal::new(25_000, 2),
            }],
            recipient_tax_id: "123.456.789-09".parse().unwrap(),
        })
    }

    fn store_with_order(method: ShippingMethod) -> (MemoryOrderStore, OrderId) {
        let orders = MemoryOrderStore::new();
        let order = order_fixture(1, method);
        let order_id = order.id;
        orders.insert_order(order);
        orders.insert_address(address_fixture(1, "Centro", "20040-020"));
        (orders, order_id)
    }

    #[tokio::test]
    async fn test_provision_is_idempotent_across_invocations() {
        let (orders, order_id) = store_with_order(carrier_method());
        let carrier = FakeCarrier::new().with_offer(9, "Correios", "SEDEX", "28.50", 2);
        let provisioner = ShipmentProvisioner::new(orders, carrier.clone(), origin());

        let first = provisioner.provision(order_id).await.unwrap();
        let ProvisionOutcome::Provisioned(info) = first else {
            panic!("expected Provisioned");
        };

        let second = provisioner.provision(order_id).await.unwrap();
        assert_eq!(second, ProvisionOutcome::AlreadyProvisioned(info));
        assert_eq!(carrier.shipment_calls(), 1);
    }

    #[tokio::test]
    async fn test_last_mile_order_is_a_success_noop() {
        let (orders, order_id) = store_with_order(ShippingMethod::LastMile {
            zone_id: ZoneId::new(1),
        });
        let carrier = FakeCarrier::new();
        let provisioner = ShipmentProvisioner::new(orders, carrier.clone(), origin());

        let outcome = provisioner.provision(order_id).await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::NotCarrierOrder);
        assert_eq!(carrier.rate_calls(), 0);
        assert_eq!(carrier.shipment_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_recipient_phone_names_the_field() {
        let orders = MemoryOrderStore::new();
        let order = order_fixture(1, carrier_method());
        let order_id = order.id;
        orders.insert_order(order);
        let mut address = address_fixture(1, "Centro", "20040-020");
        address.phone = None;
        orders.insert_address(address);

        let carrier = FakeCarrier::new().with_offer(9, "Correios", "SEDEX", "28.50", 2);
        let provisioner = ShipmentProvisioner::new(orders.clone(), carrier, origin());

        let err = provisioner.provision(order_id).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::MissingField {
                field: "recipient phone",
                ..
            }
        ));
        assert!(!err.is_retryable());

        // The order is untouched and still unprovisioned.
        assert!(orders.orders()[0].carrier_shipment_id.is_none());
    }

    #[tokio::test]
    async fn test_vanished_service_is_reported_not_substituted() {
        let (orders, order_id) = store_with_order(carrier_method());
        // Re-rating only offers PAC now; the stored selection was SEDEX.
        let carrier = FakeCarrier::new().with_offer(3, "Correios", "PAC", "22.30", 6);
        let provisioner = ShipmentProvisioner::new(orders.clone(), carrier.clone(), origin());

        let err = provisioner.provision(order_id).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::ServiceNotOffered { .. }
        ));
        assert_eq!(carrier.shipment_calls(), 0);
        assert!(orders.orders()[0].carrier_shipment_id.is_none());
    }

    #[tokio::test]
    async fn test_service_matching_ignores_case() {
        let (orders, order_id) = store_with_order(carrier_method());
        let carrier = FakeCarrier::new().with_offer(9, "CORREIOS", "sedex", "28.50", 2);
        let provisioner = ShipmentProvisioner::new(orders, carrier, origin());

        let outcome = provisioner.provision(order_id).await.unwrap();
        assert!(matches!(outcome, ProvisionOutcome::Provisioned(_)));
    }

    #[tokio::test]
    async fn test_concurrent_attempt_gets_in_progress() {
        let (orders, order_id) = store_with_order(carrier_method());
        orders.hold_lock(order_id);

        let carrier = FakeCarrier::new().with_offer(9, "Correios", "SEDEX", "28.50", 2);
        let provisioner = ShipmentProvisioner::new(orders, carrier, origin());

        let err = provisioner.provision(order_id).await.unwrap_err();
        assert!(matches!(err, ProvisionError::InProgress(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_carrier_failure_leaves_order_retryable() {
        let (orders, order_id) = store_with_order(carrier_method());
        let carrier = FakeCarrier::new()
            .with_offer(9, "Correios", "SEDEX", "28.50", 2)
            .failing_shipments("label service down");
        let provisioner = ShipmentProvisioner::new(orders.clone(), carrier.clone(), origin());

        let err = provisioner.provision(order_id).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("label service down"));
        assert!(orders.orders()[0].carrier_shipment_id.is_none());

        // Lock released; a retry can proceed.
        let carrier_ok = FakeCarrier::new().with_offer(9, "Correios", "SEDEX", "28.50", 2);
        let retry = ShipmentProvisioner::new(orders, carrier_ok, origin());
        assert!(matches!(
            retry.provision(order_id).await.unwrap(),
            ProvisionOutcome::Provisioned(_)
        ));
    }

    #[tokio::test]
    async fn test_unknown_order_is_reported() {
        let provisioner =
            ShipmentProvisioner::new(MemoryOrderStore::new(), FakeCarrier::new(), origin());
        let err = provisioner.provision(OrderId::new(404)).await.unwrap_err();
        assert!(matches!(err, ProvisionError::OrderNotFound(_)));
    }
}
