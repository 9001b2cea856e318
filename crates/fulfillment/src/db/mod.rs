//! Database operations for the fulfillment core.
//!
//! # Tables
//!
//! - `delivery_zones` - operator-configured last-mile zones
//! - `delivery_settings` - singleton last-mile settings row
//! - `customers` / `addresses` - owned by the storefront CRUD layer; read
//!   here for contact and destination data
//! - `orders` / `order_items` - created once at checkout
//! - `notification_records` - one row per status transition
//!
//! # Migrations
//!
//! Migrations are stored in `crates/fulfillment/migrations/` and run via:
//! ```bash
//! cargo run -p jabuticaba-cli -- migrate
//! ```
//!
//! # Store traits
//!
//! Each table group is reached through an async trait ([`ZoneStore`],
//! [`OrderStore`], [`NotificationStore`]) with a `Pg*` implementation, so
//! the orchestration logic stays testable without a database.

pub mod notifications;
pub mod orders;
pub mod zones;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use notifications::{NotificationStore, PgNotificationStore};
pub use orders::{OrderStore, PgOrderStore, StatusChange};
pub use zones::{PgZoneStore, ZoneStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate transition).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
