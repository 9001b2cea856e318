//! Delivery zone inspection command.
//!
//! # Usage
//!
//! ```bash
//! jab-cli zones list
//! ```

use jabuticaba_fulfillment::db::{PgZoneStore, ZoneStore, create_pool};
use secrecy::SecretString;

use super::CommandError;

/// List the active delivery zones and the settings in effect.
///
/// # Errors
///
/// Returns [`CommandError`] if `DATABASE_URL` is unset or the database
/// is unreachable.
pub async fn list() -> Result<(), CommandError> {
    let database_url = SecretString::from(
        std::env::var("DATABASE_URL").map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?,
    );
    let pool = create_pool(&database_url).await?;
    let store = PgZoneStore::new(pool);

    let settings = store.settings().await?;
    let zones = store.active_zones().await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "last-mile: {}  minimum order: {}  free-delivery threshold: {}",
            if settings.last_mile_enabled { "enabled" } else { "disabled" },
            settings.minimum_order,
            settings
                .free_delivery_threshold
                .map_or_else(|| "none".to_owned(), |t| t.to_string()),
        );
        println!();

        if zones.is_empty() {
            println!("no active zones");
        }
        for zone in zones {
            println!(
                "#{:<4} {:<24} R$ {:>8}  {:<16} [{}]",
                zone.id,
                zone.name,
                zone.price,
                zone.estimated_time,
                zone.neighborhoods.join(", "),
            );
        }
    }

    Ok(())
}
