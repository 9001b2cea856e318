//! Shipment provisioning command.
//!
//! Runs after a payment confirmation: creates the carrier shipment for an
//! order, exactly once. Safe to re-run for the same order.
//!
//! # Usage
//!
//! ```bash
//! jab-cli provision --order-id 42
//! ```

use jabuticaba_core::OrderId;
use jabuticaba_fulfillment::carrier::CarrierClient;
use jabuticaba_fulfillment::config::FulfillmentConfig;
use jabuticaba_fulfillment::db::{PgOrderStore, create_pool};
use jabuticaba_fulfillment::provisioning::{ProvisionOutcome, ShipmentProvisioner};

use super::CommandError;

/// Provision the carrier shipment for one order.
///
/// # Errors
///
/// Returns [`CommandError`] on configuration, database, or carrier
/// failures, or when the order data is not provisionable.
pub async fn run(order_id: i64) -> Result<(), CommandError> {
    let config = FulfillmentConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    let orders = PgOrderStore::new(pool);
    let carrier = CarrierClient::new(config.carrier.api_url, config.carrier.api_token)?;
    let provisioner = ShipmentProvisioner::new(orders, carrier, config.origin);

    match provisioner.provision(OrderId::new(order_id)).await? {
        ProvisionOutcome::Provisioned(info) => {
            tracing::info!(
                shipment_id = %info.shipment_id,
                protocol = %info.protocol,
                "Shipment created"
            );
        }
        ProvisionOutcome::AlreadyProvisioned(info) => {
            tracing::info!(
                shipment_id = %info.shipment_id,
                protocol = %info.protocol,
                "Order was already provisioned; nothing to do"
            );
        }
        ProvisionOutcome::NotCarrierOrder => {
            tracing::info!("Last-mile order; no carrier shipment needed");
        }
    }

    Ok(())
}
