//! Notification record store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jabuticaba_core::{NotificationId, OrderId, OrderStatus};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;

use super::RepositoryError;
use crate::models::NotificationRecord;

/// Advisory lock key for the dispatcher. One dispatcher runs at a time
/// across all processes sharing the database.
const DISPATCH_LOCK_KEY: i64 = 0x6A61_625F_6469_7370;

/// Notification record persistence contract.
///
/// Records are created by [`OrderStore::update_status`], in the same
/// transaction as the status write; this store only drains and settles
/// them.
///
/// [`OrderStore::update_status`]: super::OrderStore::update_status
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Pending records (`notified_at IS NULL`), oldest first, bounded.
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<NotificationRecord>, RepositoryError>;

    /// Mark a record handled, conditional on it still being pending.
    ///
    /// `partial_error` keeps a failed channel visible on an otherwise
    /// successful record. Returns `false` when the record was no longer
    /// pending.
    async fn mark_notified(
        &self,
        id: NotificationId,
        partial_error: Option<&str>,
    ) -> Result<bool, RepositoryError>;

    /// Record a delivery failure, leaving the record pending for retry.
    async fn record_failure(&self, id: NotificationId, error: &str)
    -> Result<(), RepositoryError>;

    /// Try to take the cross-process dispatch lock. Non-blocking.
    async fn try_acquire_dispatch_lock(&self) -> Result<bool, RepositoryError>;

    /// Release the dispatch lock.
    async fn release_dispatch_lock(&self) -> Result<(), RepositoryError>;
}

/// Internal row type for notification queries. Also mapped by the order
/// store, which inserts the transition row inside its status-update
/// transaction.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct NotificationRow {
    id: i64,
    order_id: i64,
    old_status: String,
    new_status: String,
    notified_at: Option<DateTime<Utc>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let parse = |s: &str| -> Result<OrderStatus, RepositoryError> {
            s.parse().map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
            })
        };

        Ok(Self {
            id: NotificationId::new(row.id),
            order_id: OrderId::new(row.order_id),
            old_status: parse(&row.old_status)?,
            new_status: parse(&row.new_status)?,
            notified_at: row.notified_at,
            error: row.error,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL` implementation of [`NotificationStore`].
///
/// The dispatch lock is a session-level advisory lock held on a dedicated
/// pool connection, pinned so the unlock runs on the session that took it.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
    dispatch_conn: Arc<Mutex<Option<PoolConnection<Postgres>>>>,
}

impl std::fmt::Debug for PgNotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgNotificationStore").finish_non_exhaustive()
    }
}

impl PgNotificationStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            dispatch_conn: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r"
            SELECT id, order_id, old_status, new_status, notified_at, error, created_at
            FROM notification_records
            WHERE notified_at IS NULL
            ORDER BY created_at, id
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_notified(
        &self,
        id: NotificationId,
        partial_error: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE notification_records
            SET notified_at = NOW(), error = $2
            WHERE id = $1 AND notified_at IS NULL
            ",
        )
        .bind(id)
        .bind(partial_error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failure(
        &self,
        id: NotificationId,
        error: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE notification_records
            SET error = $2
            WHERE id = $1 AND notified_at IS NULL
            ",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_acquire_dispatch_lock(&self) -> Result<bool, RepositoryError> {
        let mut guard = self.dispatch_conn.lock().await;
        if guard.is_some() {
            return Ok(false);
        }

        let mut conn = self.pool.acquire().await?;
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(DISPATCH_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await?;

        if locked {
            *guard = Some(conn);
        }
        Ok(locked)
    }

    async fn release_dispatch_lock(&self) -> Result<(), RepositoryError> {
        let conn = self.dispatch_conn.lock().await.take();
        if let Some(mut conn) = conn {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(DISPATCH_LOCK_KEY)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
