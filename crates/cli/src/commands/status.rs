//! Order status command.
//!
//! Applies a status change to an order and enqueues the customer
//! notification for the next dispatch run.
//!
//! # Usage
//!
//! ```bash
//! jab-cli set-status --order-id 42 --status shipped
//! ```

use jabuticaba_core::{OrderId, OrderStatus};
use jabuticaba_fulfillment::config::FulfillmentConfig;
use jabuticaba_fulfillment::db::{PgNotificationStore, PgOrderStore, create_pool};
use jabuticaba_fulfillment::notifications::{
    NotificationDispatcher, SmtpEmailSender, WebhookChatSender,
};

use super::CommandError;

/// Set an order's status and record the transition for notification.
///
/// # Errors
///
/// Returns [`CommandError`] for an unknown status value, a missing order,
/// or a database failure.
pub async fn run(order_id: i64, status: &str) -> Result<(), CommandError> {
    let new_status: OrderStatus = status
        .parse()
        .map_err(|e| CommandError::InvalidArgument(format!("{e}")))?;

    let config = FulfillmentConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    let notifications = PgNotificationStore::new(pool.clone());
    let orders = PgOrderStore::new(pool);
    let email = SmtpEmailSender::new(&config.email)?;
    let chat = config
        .chat
        .map(|chat| WebhookChatSender::new(chat.webhook_url, chat.api_token))
        .transpose()?;

    let dispatcher = NotificationDispatcher::new(notifications, orders, email, chat);
    match dispatcher
        .record_status_change(OrderId::new(order_id), new_status)
        .await?
    {
        Some(record) => {
            tracing::info!(
                old_status = %record.old_status,
                new_status = %record.new_status,
                "Status updated; notification queued for next dispatch run"
            );
        }
        None => {
            tracing::info!("Order already had that status; nothing queued");
        }
    }

    Ok(())
}
