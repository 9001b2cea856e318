//! Status notification models.

use chrono::{DateTime, Utc};
use jabuticaba_core::{Email, NotificationId, OrderId, OrderStatus, Phone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One pending or completed notification for a single status transition.
///
/// Exactly one record exists per `(order, old_status, new_status)`; a
/// record with `notified_at` set is terminal and is never reprocessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Record ID.
    pub id: NotificationId,
    /// Order whose status changed.
    pub order_id: OrderId,
    /// Status before the transition.
    pub old_status: OrderStatus,
    /// Status after the transition; selects the message template.
    pub new_status: OrderStatus,
    /// Set when the transition was handled (delivered on at least one
    /// channel, or there was nothing to send).
    pub notified_at: Option<DateTime<Utc>>,
    /// Failure detail for operator diagnosis. Also set alongside
    /// `notified_at` when one channel failed while the other succeeded.
    pub error: Option<String>,
    /// When the transition happened.
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Whether this record still needs dispatching.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.notified_at.is_none()
    }
}

/// Customer contact data for notification delivery.
///
/// Both channels are optional; a customer with neither is simply not
/// notified, which is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
    /// Customer display name, used in message salutations.
    pub name: String,
    /// Email channel destination.
    pub email: Option<Email>,
    /// Chat channel destination.
    pub phone: Option<Phone>,
}

/// The order fields surfaced in notification messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Order ID, shown as the order number.
    pub order_id: OrderId,
    /// Final amount charged.
    pub total: Decimal,
    /// Tracking code, when the order has one.
    pub tracking_code: Option<String>,
}
