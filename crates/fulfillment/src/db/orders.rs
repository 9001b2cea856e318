//! Order repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jabuticaba_core::{
    AddressId, CustomerId, Email, OrderId, OrderStatus, Phone, PostalCode, StateCode,
};
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;

use super::RepositoryError;
use super::notifications::NotificationRow;
use crate::models::{
    Address, CustomerContact, NewOrder, NewOrderItem, NotificationRecord, Order, ShipmentInfo,
    ShippingMethod,
};

/// Namespace for per-order advisory lock keys, XORed with the order id so
/// order locks cannot collide with the dispatcher lock key.
const ORDER_LOCK_NAMESPACE: i64 = 0x6A61_6275_7469_0000_u64 as i64;

/// Result of [`OrderStore::update_status`].
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The status the order had before the update.
    pub old_status: OrderStatus,
    /// The transition record queued for dispatch. `None` when the order
    /// already had the requested status, or when the same transition was
    /// recorded before.
    pub record: Option<NotificationRecord>,
}

/// Order persistence contract.
///
/// Checkout, provisioning and notification dispatch depend on this trait;
/// [`PgOrderStore`] is the production implementation.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order and its items as a single atomic unit.
    ///
    /// Partial writes (an order without its items) are never observable.
    async fn create_order(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError>;

    /// Fetch an order by id.
    async fn order(&self, id: OrderId) -> Result<Order, RepositoryError>;

    /// Fetch an order's shipping address.
    async fn shipping_address(&self, id: OrderId) -> Result<Address, RepositoryError>;

    /// Fetch the owning customer's contact data.
    async fn customer_contact(&self, id: OrderId) -> Result<CustomerContact, RepositoryError>;

    /// Set a new status and record the transition for notification, as a
    /// single atomic write. Either both land or neither does, so a failed
    /// call can always be retried without losing the notification.
    async fn update_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<StatusChange, RepositoryError>;

    /// Persist carrier shipment identifiers, conditional on none being
    /// present yet. Returns `false` when another attempt already won;
    /// the stored identifiers then take precedence.
    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentInfo,
    ) -> Result<bool, RepositoryError>;

    /// Try to take the per-order provisioning lock. Non-blocking; `false`
    /// means another provisioning attempt holds it.
    async fn try_lock_order(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// Release the per-order provisioning lock.
    async fn unlock_order(&self, id: OrderId) -> Result<(), RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    status: String,
    subtotal: Decimal,
    discount: Decimal,
    shipping: Decimal,
    total: Decimal,
    shipping_address_id: i64,
    shipping_method: serde_json::Value,
    notes: Option<String>,
    carrier_shipment_id: Option<String>,
    carrier_protocol: Option<String>,
    tracking_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;

        let shipping_method: ShippingMethod = serde_json::from_value(row.shipping_method)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid shipping method payload: {e}"))
            })?;

        Ok(Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            status,
            subtotal: row.subtotal,
            discount: row.discount,
            shipping: row.shipping,
            total: row.total,
            shipping_address_id: AddressId::new(row.shipping_address_id),
            shipping_method,
            notes: row.notes,
            carrier_shipment_id: row.carrier_shipment_id,
            carrier_protocol: row.carrier_protocol,
            tracking_code: row.tracking_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for address queries.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i64,
    customer_id: i64,
    recipient_name: String,
    street: String,
    number: String,
    complement: Option<String>,
    neighborhood: String,
    city: String,
    state: String,
    postal_code: String,
    phone: Option<String>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let state = StateCode::parse(&row.state).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid state in database: {e}"))
        })?;
        let postal_code = PostalCode::parse(&row.postal_code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid postal code in database: {e}"))
        })?;
        let phone = row
            .phone
            .as_deref()
            .map(Phone::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;

        Ok(Self {
            id: AddressId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            recipient_name: row.recipient_name,
            street: row.street,
            number: row.number,
            complement: row.complement,
            neighborhood: row.neighborhood,
            city: row.city,
            state,
            postal_code,
            phone,
        })
    }
}

/// Internal row type for contact queries.
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    name: String,
    email: Option<String>,
    phone: Option<String>,
}

impl TryFrom<ContactRow> for CustomerContact {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;
        let phone = row
            .phone
            .as_deref()
            .map(Phone::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;

        Ok(Self {
            name: row.name,
            email,
            phone,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` implementation of [`OrderStore`].
///
/// Provisioning locks are session-level advisory locks held on dedicated
/// pool connections, pinned here so the unlock runs on the same session
/// that took the lock.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
    provision_locks: Arc<Mutex<HashMap<i64, PoolConnection<Postgres>>>>,
}

impl std::fmt::Debug for PgOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgOrderStore").finish_non_exhaustive()
    }
}

impl PgOrderStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            provision_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    const fn lock_key(id: OrderId) -> i64 {
        ORDER_LOCK_NAMESPACE ^ id.as_i64()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError> {
        let shipping_method = serde_json::to_value(&order.shipping_method).map_err(|e| {
            RepositoryError::DataCorruption(format!("unserializable shipping method: {e}"))
        })?;

        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(
            r"
            INSERT INTO orders
                (customer_id, status, subtotal, discount, shipping, total,
                 shipping_address_id, shipping_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, customer_id, status, subtotal, discount, shipping, total,
                      shipping_address_id, shipping_method, notes,
                      carrier_shipment_id, carrier_protocol, tracking_code,
                      created_at, updated_at
            ",
        )
        .bind(order.customer_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.shipping)
        .bind(order.total)
        .bind(order.shipping_address_id)
        .bind(&shipping_method)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, product_name, unit_price, quantity, size, color)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(row.id)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(i64::from(item.quantity))
            .bind(&item.size)
            .bind(&item.color)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.try_into()
    }

    async fn order(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, status, subtotal, discount, shipping, total,
                   shipping_address_id, shipping_method, notes,
                   carrier_shipment_id, carrier_protocol, tracking_code,
                   created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn shipping_address(&self, id: OrderId) -> Result<Address, RepositoryError> {
        let row: Option<AddressRow> = sqlx::query_as(
            r"
            SELECT a.id, a.customer_id, a.recipient_name, a.street, a.number,
                   a.complement, a.neighborhood, a.city, a.state, a.postal_code, a.phone
            FROM addresses a
            JOIN orders o ON o.shipping_address_id = a.id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn customer_contact(&self, id: OrderId) -> Result<CustomerContact, RepositoryError> {
        let row: Option<ContactRow> = sqlx::query_as(
            r"
            SELECT c.name, c.email, c.phone
            FROM customers c
            JOIN orders o ON o.customer_id = c.id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn update_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let old: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let old: OrderStatus = old
            .ok_or(RepositoryError::NotFound)?
            .parse()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
            })?;

        if old == new_status {
            tx.commit().await?;
            return Ok(StatusChange {
                old_status: old,
                record: None,
            });
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

        // Same transaction as the status write: a failure here rolls the
        // status back too, so a retry still sees the old status and the
        // transition is never lost.
        let row: Option<NotificationRow> = sqlx::query_as(
            r"
            INSERT INTO notification_records (order_id, old_status, new_status)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id, old_status, new_status) DO NOTHING
            RETURNING id, order_id, old_status, new_status, notified_at, error, created_at
            ",
        )
        .bind(id)
        .bind(old.as_str())
        .bind(new_status.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StatusChange {
            old_status: old,
            record: row.map(TryInto::try_into).transpose()?,
        })
    }

    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentInfo,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET carrier_shipment_id = $2, carrier_protocol = $3, updated_at = NOW()
            WHERE id = $1 AND carrier_shipment_id IS NULL
            ",
        )
        .bind(id)
        .bind(&shipment.shipment_id)
        .bind(&shipment.protocol)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn try_lock_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut locks = self.provision_locks.lock().await;
        if locks.contains_key(&id.as_i64()) {
            return Ok(false);
        }

        let mut conn = self.pool.acquire().await?;
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(Self::lock_key(id))
            .fetch_one(&mut *conn)
            .await?;

        if locked {
            locks.insert(id.as_i64(), conn);
        }
        Ok(locked)
    }

    async fn unlock_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let conn = self.provision_locks.lock().await.remove(&id.as_i64());
        if let Some(mut conn) = conn {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(Self::lock_key(id))
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
