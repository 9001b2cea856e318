//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! jab-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use secrecy::SecretString;

use super::CommandError;

/// Run the fulfillment database migrations.
///
/// # Errors
///
/// Returns [`CommandError`] if `DATABASE_URL` is unset, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = SecretString::from(
        std::env::var("DATABASE_URL").map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?,
    );

    tracing::info!("Connecting to fulfillment database...");
    let pool = jabuticaba_fulfillment::db::create_pool(&database_url).await?;

    tracing::info!("Running fulfillment migrations...");
    sqlx::migrate!("../fulfillment/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
