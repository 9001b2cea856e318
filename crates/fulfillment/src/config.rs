//! Fulfillment configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `CARRIER_API_URL` - Carrier aggregator API base URL
//! - `CARRIER_API_TOKEN` - Carrier aggregator API token
//! - `PAYMENT_API_URL` - Payment provider API base URL
//! - `PAYMENT_API_TOKEN` - Payment provider API token
//! - `PAYMENT_SUCCESS_URL` - Redirect after an approved payment
//! - `PAYMENT_FAILURE_URL` - Redirect after a declined payment
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address
//! - `ORIGIN_NAME` - Shipper name on carrier labels
//! - `ORIGIN_PHONE` - Shipper phone
//! - `ORIGIN_STREET`, `ORIGIN_NUMBER`, `ORIGIN_NEIGHBORHOOD`,
//!   `ORIGIN_CITY`, `ORIGIN_STATE`, `ORIGIN_POSTAL_CODE` - Shipper address
//!
//! ## Optional
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `CHAT_WEBHOOK_URL` - Chat gateway webhook (enables the chat channel)
//! - `CHAT_WEBHOOK_TOKEN` - Chat gateway token (set together with the URL)

use jabuticaba_core::{Phone, PostalCode, StateCode};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::models::OriginAddress;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Fulfillment service configuration.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Carrier aggregator API configuration
    pub carrier: CarrierConfig,
    /// Payment provider configuration
    pub payment: PaymentConfig,
    /// Email (SMTP) configuration
    pub email: EmailConfig,
    /// Chat webhook configuration (optional - enables the chat channel)
    pub chat: Option<ChatConfig>,
    /// Warehouse address shipments originate from
    pub origin: OriginAddress,
}

/// Carrier aggregator API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct CarrierConfig {
    /// API base URL
    pub api_url: Url,
    /// API token
    pub api_token: SecretString,
}

impl std::fmt::Debug for CarrierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Payment provider configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct PaymentConfig {
    /// API base URL
    pub api_url: Url,
    /// API token
    pub api_token: SecretString,
    /// Redirect after an approved payment
    pub success_url: Url,
    /// Redirect after a declined payment
    pub failure_url: Url,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("success_url", &self.success_url.as_str())
            .field("failure_url", &self.failure_url.as_str())
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Chat webhook configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ChatConfig {
    /// Webhook URL
    pub webhook_url: Url,
    /// Gateway token
    pub api_token: SecretString,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("webhook_url", &self.webhook_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl FulfillmentConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_required_secret("DATABASE_URL")?,
            carrier: CarrierConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
            email: EmailConfig::from_env()?,
            chat: ChatConfig::from_env()?,
            origin: origin_from_env()?,
        })
    }
}

impl CarrierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_url("CARRIER_API_URL")?,
            api_token: get_required_secret("CARRIER_API_TOKEN")?,
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_url("PAYMENT_API_URL")?,
            api_token: get_required_secret("PAYMENT_API_TOKEN")?,
            success_url: get_url("PAYMENT_SUCCESS_URL")?,
            failure_url: get_url("PAYMENT_FAILURE_URL")?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        })
    }
}

impl ChatConfig {
    /// Load chat configuration from environment.
    ///
    /// Returns `None` if the chat variables are not set (chat channel
    /// disabled). Both variables must be set together.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let webhook_url = get_optional_env("CHAT_WEBHOOK_URL");
        let api_token = get_optional_env("CHAT_WEBHOOK_TOKEN");

        match (webhook_url, api_token) {
            (Some(url), Some(token)) => Ok(Some(Self {
                webhook_url: url.parse().map_err(|e: url::ParseError| {
                    ConfigError::InvalidEnvVar("CHAT_WEBHOOK_URL".to_string(), e.to_string())
                })?,
                api_token: SecretString::from(token),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "CHAT_WEBHOOK_*".to_string(),
                "Both CHAT_WEBHOOK_URL and CHAT_WEBHOOK_TOKEN must be set together".to_string(),
            )),
        }
    }
}

fn origin_from_env() -> Result<OriginAddress, ConfigError> {
    let phone = Phone::parse(&get_required_env("ORIGIN_PHONE")?)
        .map_err(|e| ConfigError::InvalidEnvVar("ORIGIN_PHONE".to_string(), e.to_string()))?;
    let state = StateCode::parse(&get_required_env("ORIGIN_STATE")?)
        .map_err(|e| ConfigError::InvalidEnvVar("ORIGIN_STATE".to_string(), e.to_string()))?;
    let postal_code = PostalCode::parse(&get_required_env("ORIGIN_POSTAL_CODE")?)
        .map_err(|e| ConfigError::InvalidEnvVar("ORIGIN_POSTAL_CODE".to_string(), e.to_string()))?;

    Ok(OriginAddress {
        name: get_required_env("ORIGIN_NAME")?,
        phone,
        street: get_required_env("ORIGIN_STREET")?,
        number: get_required_env("ORIGIN_NUMBER")?,
        neighborhood: get_required_env("ORIGIN_NEIGHBORHOOD")?,
        city: get_required_env("ORIGIN_CITY")?,
        state,
        postal_code,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get a required environment variable parsed as a URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    get_required_env(key)?
        .parse()
        .map_err(|e: url::ParseError| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
