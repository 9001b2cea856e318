//! Customer notification dispatch.
//!
//! Status transitions are recorded durably and delivered out-of-band: a
//! dispatcher drains pending records in batches, renders the copy for the
//! destination status and attempts every channel the customer has. A
//! record is settled once at least one channel got through (or there is
//! nothing to deliver to); otherwise it stays pending for the next run.

mod chat;
mod email;
mod templates;

pub use chat::{ChatError, ChatMetadata, ChatSender, WebhookChatSender};
pub use email::{EmailError, EmailSender, SmtpEmailSender};
pub use templates::{MessageContext, RenderedMessages, render};

use jabuticaba_core::{OrderId, OrderStatus};
use tracing::instrument;

use crate::db::{NotificationStore, OrderStore, RepositoryError};
use crate::models::{CustomerContact, NotificationRecord, OrderSummary};

/// Records drained per dispatch run.
const DEFAULT_BATCH_SIZE: u32 = 50;

/// Errors that can occur while dispatching notifications.
///
/// Only batch-level failures surface here; a delivery failure for one
/// record is recorded on that record and counted in the summary instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What one dispatch run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Records examined.
    pub processed: u32,
    /// Records settled with at least one channel delivered.
    pub sent: u32,
    /// Records settled because the customer has no contact data.
    pub skipped_no_contact: u32,
    /// Records left pending after all channels failed.
    pub failed: u32,
    /// Another dispatcher held the lock; nothing was examined.
    pub lock_busy: bool,
}

enum RecordOutcome {
    Sent,
    SkippedNoContact,
    Failed,
}

/// Drains pending status-change records and delivers them over email and
/// chat.
pub struct NotificationDispatcher<N, O, E, Ch> {
    notifications: N,
    orders: O,
    email: E,
    /// `None` when no chat gateway is configured; the phone channel is
    /// then simply not attempted.
    chat: Option<Ch>,
    batch_size: u32,
}

impl<N, O, E, Ch> NotificationDispatcher<N, O, E, Ch>
where
    N: NotificationStore,
    O: OrderStore,
    E: EmailSender,
    Ch: ChatSender,
{
    /// Create a dispatcher with the default batch size.
    pub const fn new(notifications: N, orders: O, email: E, chat: Option<Ch>) -> Self {
        Self {
            notifications,
            orders,
            email,
            chat,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the per-run batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Apply a status change to an order and enqueue its notification.
    ///
    /// The status write and the transition record are one atomic store
    /// operation, so a failure leaves the old status in place and the
    /// change can be retried. A change to the status the order already
    /// has is a no-op; so is a transition that was already recorded.
    /// Delivery happens later via
    /// [`dispatch_pending`](Self::dispatch_pending).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Repository`] if the order does not exist
    /// or persistence fails.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn record_status_change(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Option<NotificationRecord>, DispatchError> {
        let change = self.orders.update_status(order_id, new_status).await?;
        if change.record.is_none() {
            tracing::debug!(
                order_id = %order_id,
                old_status = %change.old_status,
                "status unchanged or transition already recorded; nothing to notify"
            );
        }
        Ok(change.record)
    }

    /// Drain one batch of pending notifications, oldest first.
    ///
    /// Only one run is active at a time across all processes sharing the
    /// store; a second concurrent call returns a `lock_busy` summary
    /// without touching any record.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Repository`] if the pending batch cannot
    /// be fetched. Per-record delivery failures do not fail the run.
    #[instrument(skip(self))]
    pub async fn dispatch_pending(&self) -> Result<DispatchSummary, DispatchError> {
        if !self.notifications.try_acquire_dispatch_lock().await? {
            tracing::debug!("another dispatcher holds the lock; skipping run");
            return Ok(DispatchSummary {
                lock_busy: true,
                ..DispatchSummary::default()
            });
        }

        let result = self.dispatch_locked().await;

        if let Err(e) = self.notifications.release_dispatch_lock().await {
            tracing::warn!(error = %e, "failed to release dispatch lock");
        }

        result
    }

    async fn dispatch_locked(&self) -> Result<DispatchSummary, DispatchError> {
        let pending = self.notifications.fetch_pending(self.batch_size).await?;

        let mut summary = DispatchSummary::default();
        for record in pending {
            summary.processed += 1;
            match self.process_record(&record).await {
                RecordOutcome::Sent => summary.sent += 1,
                RecordOutcome::SkippedNoContact => summary.skipped_no_contact += 1,
                RecordOutcome::Failed => summary.failed += 1,
            }
        }

        tracing::info!(
            processed = summary.processed,
            sent = summary.sent,
            skipped = summary.skipped_no_contact,
            failed = summary.failed,
            "dispatch run finished"
        );
        Ok(summary)
    }

    async fn process_record(&self, record: &NotificationRecord) -> RecordOutcome {
        match self.deliver(record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(record_id = %record.id, error = %e, "notification delivery errored");
                if let Err(e) = self
                    .notifications
                    .record_failure(record.id, &e.to_string())
                    .await
                {
                    tracing::error!(record_id = %record.id, error = %e, "failed to record delivery failure");
                }
                RecordOutcome::Failed
            }
        }
    }

    async fn deliver(
        &self,
        record: &NotificationRecord,
    ) -> Result<RecordOutcome, RepositoryError> {
        let contact = self.orders.customer_contact(record.order_id).await?;
        let chat_reachable = self.chat.is_some() && contact.phone.is_some();

        // No reachable channel; settle the record so it is never retried.
        if contact.email.is_none() && !chat_reachable {
            tracing::info!(record_id = %record.id, order_id = %record.order_id, "no reachable channel; settling record");
            self.notifications.mark_notified(record.id, None).await?;
            return Ok(RecordOutcome::SkippedNoContact);
        }

        let order = self.orders.order(record.order_id).await?;
        let summary = OrderSummary {
            order_id: order.id,
            total: order.total,
            tracking_code: order.tracking_code.clone(),
        };
        let ctx = MessageContext {
            customer_name: &contact.name,
            order: &summary,
        };

        let messages = match render(record.new_status, &ctx) {
            Ok(messages) => messages,
            Err(e) => {
                self.notifications
                    .record_failure(record.id, &format!("template rendering failed: {e}"))
                    .await?;
                return Ok(RecordOutcome::Failed);
            }
        };

        let failures = self.attempt_channels(record, &contact, &messages).await;
        let attempted = u32::from(contact.email.is_some()) + u32::from(chat_reachable);

        if (failures.len() as u32) < attempted {
            let partial_error = if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            };
            self.notifications
                .mark_notified(record.id, partial_error.as_deref())
                .await?;
            Ok(RecordOutcome::Sent)
        } else {
            self.notifications
                .record_failure(record.id, &failures.join("; "))
                .await?;
            Ok(RecordOutcome::Failed)
        }
    }

    /// Attempt every channel the customer has; one channel failing never
    /// stops the other. Returns the failure descriptions.
    async fn attempt_channels(
        &self,
        record: &NotificationRecord,
        contact: &CustomerContact,
        messages: &RenderedMessages,
    ) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(email) = &contact.email {
            if let Err(e) = self
                .email
                .send(email, &messages.subject, &messages.text, &messages.html)
                .await
            {
                tracing::warn!(record_id = %record.id, error = %e, "email channel failed");
                failures.push(format!("email: {e}"));
            }
        }

        if let (Some(chat), Some(phone)) = (&self.chat, &contact.phone) {
            let metadata = ChatMetadata {
                order_id: record.order_id,
                new_status: record.new_status,
            };
            if let Err(e) = chat.post(&phone.e164(), &messages.chat, &metadata).await {
                tracing::warn!(record_id = %record.id, error = %e, "chat channel failed");
                failures.push(format!("chat: {e}"));
            }
        }

        failures
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::ShippingMethod;
    use crate::testing::{
        MemoryNotificationStore, MemoryOrderStore, RecordingChatSender, RecordingEmailSender,
        order_fixture,
    };
    use jabuticaba_core::{CustomerId, Email, Phone, ZoneId};

    fn contact(email: Option<&str>, phone: Option<&str>) -> CustomerContact {
        CustomerContact {
            name: "Maria".to_owned(),
            email: email.map(|e| Email::parse(e).unwrap()),
            phone: phone.map(|p| Phone::parse(p).unwrap()),
        }
    }

    fn dispatcher(
        notifications: MemoryNotificationStore,
        orders: MemoryOrderStore,
        email: RecordingEmailSender,
        chat: RecordingChatSender,
    ) -> NotificationDispatcher<
        MemoryNotificationStore,
        MemoryOrderStore,
        RecordingEmailSender,
        RecordingChatSender,
    > {
        NotificationDispatcher::new(notifications, orders, email, Some(chat))
    }

    /// Seed a pending notification by pushing the order to `Confirmed`
    /// through the store, the same path production status changes take.
    async fn seed_order(orders: &MemoryOrderStore, contact: CustomerContact) -> OrderId {
        let order = order_fixture(
            1,
            ShippingMethod::LastMile {
                zone_id: ZoneId::new(1),
            },
        );
        let order_id = order.id;
        orders.insert_order(order);
        orders.set_contact(CustomerId::new(1), contact);
        orders
            .update_status(order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        order_id
    }

    #[tokio::test]
    async fn test_both_channels_attempted_and_record_settled() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        seed_order(&orders, contact(Some("maria@example.com"), Some("11987654321"))).await;

        let email = RecordingEmailSender::new();
        let chat = RecordingChatSender::new();
        let dispatcher = dispatcher(notifications.clone(), orders, email.clone(), chat.clone());

        let summary = dispatcher.dispatch_pending().await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(email.sent().len(), 1);
        assert_eq!(chat.posts().len(), 1);

        let records = notifications.records();
        assert!(records[0].notified_at.is_some());
        assert!(records[0].error.is_none());
    }

    #[tokio::test]
    async fn test_settled_record_is_never_reprocessed() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        seed_order(&orders, contact(Some("maria@example.com"), None)).await;

        let email = RecordingEmailSender::new();
        let chat = RecordingChatSender::new();
        let dispatcher = dispatcher(notifications, orders, email.clone(), chat);

        dispatcher.dispatch_pending().await.unwrap();
        let summary = dispatcher.dispatch_pending().await.unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(email.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_no_contact_settles_record_without_sends() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        seed_order(&orders, contact(None, None)).await;

        let email = RecordingEmailSender::new();
        let chat = RecordingChatSender::new();
        let dispatcher = dispatcher(notifications.clone(), orders, email.clone(), chat.clone());

        let summary = dispatcher.dispatch_pending().await.unwrap();
        assert_eq!(summary.skipped_no_contact, 1);
        assert!(email.sent().is_empty());
        assert!(chat.posts().is_empty());
        assert!(notifications.records()[0].notified_at.is_some());
    }

    #[tokio::test]
    async fn test_one_channel_failing_still_settles_and_keeps_detail() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        seed_order(&orders, contact(Some("maria@example.com"), Some("11987654321"))).await;

        let email = RecordingEmailSender::new();
        let chat = RecordingChatSender::failing("gateway timeout");
        let dispatcher = dispatcher(notifications.clone(), orders, email, chat);

        let summary = dispatcher.dispatch_pending().await.unwrap();
        assert_eq!(summary.sent, 1);

        let record = &notifications.records()[0];
        assert!(record.notified_at.is_some());
        assert!(record.error.as_deref().unwrap().contains("gateway timeout"));
    }

    #[tokio::test]
    async fn test_all_channels_failing_leaves_record_pending() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        seed_order(&orders, contact(Some("maria@example.com"), Some("11987654321"))).await;

        let email = RecordingEmailSender::failing("relay down");
        let chat = RecordingChatSender::failing("gateway timeout");
        let dispatcher = dispatcher(notifications.clone(), orders, email, chat);

        let summary = dispatcher.dispatch_pending().await.unwrap();
        assert_eq!(summary.failed, 1);

        let record = &notifications.records()[0];
        assert!(record.notified_at.is_none());
        let error = record.error.as_deref().unwrap();
        assert!(error.contains("relay down"));
        assert!(error.contains("gateway timeout"));
    }

    #[tokio::test]
    async fn test_concurrent_run_yields_lock_busy() {
        let notifications = MemoryNotificationStore::new();
        notifications.hold_dispatch_lock();

        let orders = MemoryOrderStore::new();
        let dispatcher = dispatcher(
            notifications,
            orders,
            RecordingEmailSender::new(),
            RecordingChatSender::new(),
        );

        let summary = dispatcher.dispatch_pending().await.unwrap();
        assert!(summary.lock_busy);
        assert_eq!(summary.processed, 0);
    }

    #[tokio::test]
    async fn test_unchanged_status_records_nothing() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        let order = order_fixture(
            7,
            ShippingMethod::LastMile {
                zone_id: ZoneId::new(1),
            },
        );
        let order_id = order.id;
        orders.insert_order(order);

        let dispatcher = dispatcher(
            notifications.clone(),
            orders,
            RecordingEmailSender::new(),
            RecordingChatSender::new(),
        );

        let recorded = dispatcher
            .record_status_change(order_id, OrderStatus::Pending)
            .await
            .unwrap();
        assert!(recorded.is_none());
        assert!(notifications.records().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_transition_is_recorded_once() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        let order = order_fixture(
            9,
            ShippingMethod::LastMile {
                zone_id: ZoneId::new(1),
            },
        );
        let order_id = order.id;
        orders.insert_order(order);

        let dispatcher = dispatcher(
            notifications.clone(),
            orders,
            RecordingEmailSender::new(),
            RecordingChatSender::new(),
        );

        // Pending -> Confirmed -> Pending -> Confirmed: the repeated
        // pending->confirmed transition is absorbed.
        let first = dispatcher
            .record_status_change(order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        dispatcher
            .record_status_change(order_id, OrderStatus::Pending)
            .await
            .unwrap();
        let repeat = dispatcher
            .record_status_change(order_id, OrderStatus::Confirmed)
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(repeat.is_none());
        assert_eq!(notifications.records().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_status_write_loses_neither_status_nor_transition() {
        let notifications = MemoryNotificationStore::new();
        let orders = MemoryOrderStore::with_notifications(notifications.clone());
        let order = order_fixture(
            11,
            ShippingMethod::LastMile {
                zone_id: ZoneId::new(1),
            },
        );
        let order_id = order.id;
        orders.insert_order(order);

        let dispatcher = dispatcher(
            notifications.clone(),
            orders.clone(),
            RecordingEmailSender::new(),
            RecordingChatSender::new(),
        );

        orders.fail_next_update_status("connection reset");
        let result = dispatcher
            .record_status_change(order_id, OrderStatus::Shipped)
            .await;
        assert!(result.is_err());

        // The failed attempt changed nothing, so the retry still sees the
        // old status and queues the notification.
        assert_eq!(orders.orders()[0].status, OrderStatus::Pending);
        assert!(notifications.records().is_empty());

        let record = dispatcher
            .record_status_change(order_id, OrderStatus::Shipped)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.old_status, OrderStatus::Pending);
        assert_eq!(record.new_status, OrderStatus::Shipped);
        assert_eq!(notifications.records().len(), 1);
    }
}
