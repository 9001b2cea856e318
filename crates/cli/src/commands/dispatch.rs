//! Notification dispatch command.
//!
//! Drains one batch of pending status-change notifications. Intended to be
//! run from a scheduler; concurrent runs are excluded by the dispatch lock
//! and simply exit without doing anything.
//!
//! # Usage
//!
//! ```bash
//! jab-cli dispatch
//! jab-cli dispatch --batch-size 200
//! ```

use jabuticaba_fulfillment::config::FulfillmentConfig;
use jabuticaba_fulfillment::db::{PgNotificationStore, PgOrderStore, create_pool};
use jabuticaba_fulfillment::notifications::{
    NotificationDispatcher, SmtpEmailSender, WebhookChatSender,
};

use super::CommandError;

/// Drain one batch of pending notifications.
///
/// # Errors
///
/// Returns [`CommandError`] on configuration, database, or channel setup
/// failures. Per-record delivery failures are recorded, not returned.
pub async fn run(batch_size: Option<u32>) -> Result<(), CommandError> {
    let config = FulfillmentConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    let notifications = PgNotificationStore::new(pool.clone());
    let orders = PgOrderStore::new(pool);
    let email = SmtpEmailSender::new(&config.email)?;
    let chat = config
        .chat
        .map(|chat| WebhookChatSender::new(chat.webhook_url, chat.api_token))
        .transpose()?;
    if chat.is_none() {
        tracing::info!("No chat gateway configured; chat channel disabled");
    }

    let mut dispatcher = NotificationDispatcher::new(notifications, orders, email, chat);
    if let Some(batch_size) = batch_size {
        dispatcher = dispatcher.with_batch_size(batch_size);
    }

    let summary = dispatcher.dispatch_pending().await?;
    if summary.lock_busy {
        tracing::info!("Another dispatcher is running; nothing to do");
    } else {
        tracing::info!(
            processed = summary.processed,
            sent = summary.sent,
            skipped = summary.skipped_no_contact,
            failed = summary.failed,
            "Dispatch run complete"
        );
    }

    Ok(())
}
