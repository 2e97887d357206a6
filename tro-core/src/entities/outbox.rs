//! Transactional outbox records.
//!
//! Outbox rows are appended inside the same transaction as the business
//! write they describe, then drained to the broker by the publisher
//! worker. The `dedupe_key` travels as the broker message id so consumers
//! can drop re-publishes.

use crate::error::CoreError;
use crate::events::{self, HoldExpiredPayload, OrderCreatedPayload, OrderSettledPayload};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// Outbox row status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE", type_name = "outbox_status")]
pub enum OutboxStatus {
    New,
    Published,
    Failed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload_json: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub published_at: Option<OffsetDateTime>,
    pub status: OutboxStatus,
    pub dedupe_key: String,
    pub attempt_count: i32,
}

impl OutboxRecord {
    fn pending(
        aggregate_type: &str,
        aggregate_id: Uuid,
        event_type: &str,
        payload_json: serde_json::Value,
        dedupe_key: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            event_type: event_type.to_string(),
            payload_json,
            created_at: OffsetDateTime::now_utc(),
            published_at: None,
            status: OutboxStatus::New,
            dedupe_key,
            attempt_count: 0,
        }
    }

    /// Row announcing a freshly committed order.
    pub fn order_created(order_id: Uuid) -> Result<Self, CoreError> {
        let payload = serde_json::to_value(OrderCreatedPayload { order_id })?;
        Ok(Self::pending(
            "order",
            order_id,
            events::ORDER_CREATED,
            payload,
            Uuid::new_v4().to_string(),
        ))
    }

    /// Row announcing a terminal order status; deduped on the payment
    /// provider's transaction id so duplicate callbacks collapse.
    pub fn order_settled(
        order_id: Uuid,
        event_type: &str,
        status: &str,
        transaction_id: String,
    ) -> Result<Self, CoreError> {
        let payload = serde_json::to_value(OrderSettledPayload {
            order_id,
            status: status.to_string(),
        })?;
        Ok(Self::pending(
            "order",
            order_id,
            event_type,
            payload,
            transaction_id,
        ))
    }

    /// Row announcing an expired hold; deduped on the hold id so repeated
    /// expiry passes collapse.
    pub fn hold_expired(hold_id: Uuid) -> Result<Self, CoreError> {
        let payload = serde_json::to_value(HoldExpiredPayload { hold_id })?;
        Ok(Self::pending(
            "hold",
            hold_id,
            events::HOLD_EXPIRED,
            payload,
            hold_id.to_string(),
        ))
    }

    /// Append a NEW row inside the caller's transaction.
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        record: &OutboxRecord,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO outbox (id, aggregate_type, aggregate_id, event_type, payload_json, status, dedupe_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.aggregate_type)
        .bind(record.aggregate_id)
        .bind(&record.event_type)
        .bind(&record.payload_json)
        .bind(record.status)
        .bind(&record.dedupe_key)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Claim up to `limit` of the oldest NEW rows.
///
/// The scan runs in its own short transaction with `FOR UPDATE SKIP LOCKED`
/// so concurrent publishers partition the queue without blocking; the lock
/// is dropped when the scan commits and rows are updated later by primary
/// key.
pub struct GetUnpublishedOutbox {
    pub limit: i64,
}

impl Processor<GetUnpublishedOutbox, Result<Vec<OutboxRecord>, CoreError>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:GetUnpublishedOutbox")]
    async fn process(&self, query: GetUnpublishedOutbox) -> Result<Vec<OutboxRecord>, CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;
        let records = sqlx::query_as::<_, OutboxRecord>(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload_json,
                   created_at, published_at, status, dedupe_key, attempt_count
            FROM outbox
            WHERE status = $2
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(query.limit)
        .bind(OutboxStatus::New)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await.map_err(CoreError::from)?;
        Ok(records)
    }
}

#[derive(Debug, Clone)]
/// Mark a row PUBLISHED after broker acknowledgement.
pub struct MarkOutboxPublished {
    pub id: Uuid,
    pub published_at: OffsetDateTime,
}

impl Processor<MarkOutboxPublished, Result<(), CoreError>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOutboxPublished")]
    async fn process(&self, cmd: MarkOutboxPublished) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE outbox SET status = $3, published_at = $2
            WHERE id = $1
            "#,
        )
        .bind(cmd.id)
        .bind(cmd.published_at)
        .bind(OutboxStatus::Published)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Bump a row's attempt counter after a failed publish round.
///
/// Returns the new total so the caller can apply the FAILED policy.
pub struct IncrementOutboxAttempts {
    pub id: Uuid,
}

impl Processor<IncrementOutboxAttempts, Result<i32, CoreError>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:IncrementOutboxAttempts")]
    async fn process(&self, cmd: IncrementOutboxAttempts) -> Result<i32, CoreError> {
        let attempts: i32 = sqlx::query_scalar(
            r#"
            UPDATE outbox SET attempt_count = attempt_count + 1
            WHERE id = $1
            RETURNING attempt_count
            "#,
        )
        .bind(cmd.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempts)
    }
}

#[derive(Debug, Clone)]
/// Park a row as FAILED once the publish budget is exhausted.
pub struct MarkOutboxFailed {
    pub id: Uuid,
}

impl Processor<MarkOutboxFailed, Result<(), CoreError>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOutboxFailed")]
    async fn process(&self, cmd: MarkOutboxFailed) -> Result<(), CoreError> {
        sqlx::query("UPDATE outbox SET status = $2 WHERE id = $1")
            .bind(cmd.id)
            .bind(OutboxStatus::Failed)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn order_created_rows_get_fresh_dedupe_keys() {
        let order_id = Uuid::new_v4();
        let a = OutboxRecord::order_created(order_id).unwrap();
        let b = OutboxRecord::order_created(order_id).unwrap();
        assert_eq!(a.event_type, "order.created");
        assert_eq!(a.aggregate_type, "order");
        assert_eq!(a.aggregate_id, order_id);
        assert_ne!(a.dedupe_key, b.dedupe_key);
        assert_eq!(a.payload_json["order_id"], order_id.to_string());
    }

    #[test]
    fn settled_rows_dedupe_on_transaction_id() {
        let order_id = Uuid::new_v4();
        let rec = OutboxRecord::order_settled(
            order_id,
            "order.confirmed",
            "CONFIRMED",
            "tx1".to_string(),
        )
        .unwrap();
        assert_eq!(rec.dedupe_key, "tx1");
        assert_eq!(rec.payload_json["status"], "CONFIRMED");
    }

    #[test]
    fn hold_expired_rows_dedupe_on_hold_id() {
        let hold_id = Uuid::new_v4();
        let rec = OutboxRecord::hold_expired(hold_id).unwrap();
        assert_eq!(rec.event_type, "hold.expired");
        assert_eq!(rec.dedupe_key, hold_id.to_string());
        assert_eq!(rec.aggregate_type, "hold");
    }
}
