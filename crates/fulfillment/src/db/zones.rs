//! Delivery zone and settings store.

use async_trait::async_trait;
use jabuticaba_core::ZoneId;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{DeliverySettings, DeliveryZone};

/// Read access to zone configuration.
///
/// Zones and settings are written by an administrative surface outside
/// this core; the checkout flow only reads them.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// All active zones, in operator-defined order.
    async fn active_zones(&self) -> Result<Vec<DeliveryZone>, RepositoryError>;

    /// The singleton settings row; permissive defaults when absent.
    async fn settings(&self) -> Result<DeliverySettings, RepositoryError>;
}

/// Internal row type for zone queries.
#[derive(Debug, sqlx::FromRow)]
struct ZoneRow {
    id: i64,
    name: String,
    neighborhoods: Vec<String>,
    price: Decimal,
    estimated_time: String,
    is_active: bool,
}

impl From<ZoneRow> for DeliveryZone {
    fn from(row: ZoneRow) -> Self {
        Self {
            id: ZoneId::new(row.id),
            name: row.name,
            neighborhoods: row.neighborhoods,
            price: row.price,
            estimated_time: row.estimated_time,
            is_active: row.is_active,
        }
    }
}

/// Internal row type for the settings singleton.
#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    last_mile_enabled: bool,
    minimum_order: Decimal,
    free_delivery_threshold: Option<Decimal>,
}

/// `PostgreSQL` implementation of [`ZoneStore`].
#[derive(Debug, Clone)]
pub struct PgZoneStore {
    pool: PgPool,
}

impl PgZoneStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ZoneStore for PgZoneStore {
    async fn active_zones(&self) -> Result<Vec<DeliveryZone>, RepositoryError> {
        let rows: Vec<ZoneRow> = sqlx::query_as(
            r"
            SELECT id, name, neighborhoods, price, estimated_time, is_active
            FROM delivery_zones
            WHERE is_active
            ORDER BY sort_order, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn settings(&self) -> Result<DeliverySettings, RepositoryError> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r"
            SELECT last_mile_enabled, minimum_order, free_delivery_threshold
            FROM delivery_settings
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map_or_else(DeliverySettings::default, |r| DeliverySettings {
            last_mile_enabled: r.last_mile_enabled,
            minimum_order: r.minimum_order,
            free_delivery_threshold: r.free_delivery_threshold,
        }))
    }
}
