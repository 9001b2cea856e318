//! CLI command implementations.

pub mod dispatch;
pub mod migrate;
pub mod provision;
pub mod status;
pub mod zones;

use jabuticaba_fulfillment::carrier::CarrierError;
use jabuticaba_fulfillment::config::ConfigError;
use jabuticaba_fulfillment::db::RepositoryError;
use jabuticaba_fulfillment::notifications::{ChatError, DispatchError};
use jabuticaba_fulfillment::provisioning::ProvisionError;
use thiserror::Error;

/// Errors that can occur while running a CLI command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
