//! Hold entity and its store operations.
//!
//! A hold reserves one or more seats for a bounded window. Physically each
//! `(hold_id, seat_no)` pair is one row so the store can enforce the
//! one-active-hold-per-seat invariant with a partial unique index.

use crate::error::CoreError;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// Hold status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE", type_name = "hold_status")]
pub enum HoldStatus {
    Active,
    Released,
    Expired,
}

/// A hold over a set of seats, reassembled from its per-seat rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hold {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub seats: Vec<String>,
}

impl Hold {
    /// Build a new hold expiring `ttl` from now.
    ///
    /// `seats` must already be sorted lexicographically; the service
    /// boundary owns that discipline.
    pub fn new(
        event_id: Uuid,
        seats: Vec<String>,
        user_id: Uuid,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            expires_at: OffsetDateTime::now_utc() + ttl,
            seats,
        }
    }

    /// Insert every seat row of this hold, failing with [`CoreError::Conflict`]
    /// as soon as one seat already has an active hold.
    ///
    /// Seats are inserted in the given order; callers sort them so that
    /// concurrent transactions never interleave in opposite orders.
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        hold: &Hold,
    ) -> Result<(), CoreError> {
        for seat in &hold.seats {
            let inserted: Option<Uuid> = sqlx::query_scalar(
                r#"
                INSERT INTO holds (id, event_id, seat_no, user_id, expires_at, status)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (event_id, seat_no) WHERE status = 'ACTIVE' DO NOTHING
                RETURNING id
                "#,
            )
            .bind(hold.id)
            .bind(hold.event_id)
            .bind(seat)
            .bind(hold.user_id)
            .bind(hold.expires_at)
            .bind(HoldStatus::Active)
            .fetch_optional(&mut **tx)
            .await?;

            if inserted.is_none() {
                return Err(CoreError::Conflict);
            }
        }
        Ok(())
    }

    /// Flip this hold to RELEASED if it is still ACTIVE.
    ///
    /// Returns `false` when the hold was already released (by an order or a
    /// concurrent expiry pass), which callers treat as a no-op.
    pub async fn release_tx(
        tx: &mut Transaction<'_, Postgres>,
        hold_id: Uuid,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE holds SET status = $2
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(hold_id)
        .bind(HoldStatus::Released)
        .bind(HoldStatus::Active)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// One seat row as read back from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HoldSeatRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub seat_no: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

/// Regroup seat rows (ordered by hold id) into logical holds.
pub fn group_seat_rows(rows: Vec<HoldSeatRow>) -> Vec<Hold> {
    let mut holds: Vec<Hold> = Vec::new();
    for row in rows {
        match holds.last_mut() {
            Some(current) if current.id == row.id => current.seats.push(row.seat_no),
            _ => holds.push(Hold {
                id: row.id,
                event_id: row.event_id,
                user_id: row.user_id,
                expires_at: row.expires_at,
                seats: vec![row.seat_no],
            }),
        }
    }
    holds
}

#[derive(Debug, Clone)]
/// Fetch every ACTIVE hold whose expiry deadline has passed.
pub struct GetExpiredHolds {
    pub now: OffsetDateTime,
}

impl Processor<GetExpiredHolds, Result<Vec<Hold>, CoreError>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:GetExpiredHolds")]
    async fn process(&self, query: GetExpiredHolds) -> Result<Vec<Hold>, CoreError> {
        let rows = sqlx::query_as::<_, HoldSeatRow>(
            r#"
            SELECT id, event_id, seat_no, user_id, expires_at
            FROM holds
            WHERE status = $2 AND expires_at <= $1
            ORDER BY id, seat_no
            "#,
        )
        .bind(query.now)
        .bind(HoldStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(group_seat_rows(rows))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(id: Uuid, seat: &str) -> HoldSeatRow {
        HoldSeatRow {
            id,
            event_id: Uuid::new_v4(),
            seat_no: seat.to_string(),
            user_id: Uuid::new_v4(),
            expires_at: datetime!(2025-06-01 12:00 UTC),
        }
    }

    #[test]
    fn groups_adjacent_rows_into_one_hold() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let holds = group_seat_rows(vec![row(a, "A1"), row(a, "A2"), row(b, "B1")]);
        assert_eq!(holds.len(), 2);
        let first = holds.iter().find(|h| h.id == a).unwrap();
        assert_eq!(first.seats, vec!["A1", "A2"]);
        let second = holds.iter().find(|h| h.id == b).unwrap();
        assert_eq!(second.seats, vec!["B1"]);
    }

    #[test]
    fn empty_rows_group_to_no_holds() {
        assert!(group_seat_rows(Vec::new()).is_empty());
    }

    #[test]
    fn new_hold_expires_after_ttl() {
        let before = OffsetDateTime::now_utc();
        let hold = Hold::new(
            Uuid::new_v4(),
            vec!["A1".into()],
            Uuid::new_v4(),
            std::time::Duration::from_secs(300),
        );
        let elapsed = hold.expires_at - before;
        assert!(elapsed >= time::Duration::minutes(5));
        assert!(elapsed < time::Duration::minutes(6));
    }
}
