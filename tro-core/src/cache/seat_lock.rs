//! Short-TTL per-seat locks.
//!
//! A lock is a `SET NX` entry keyed by event and seat, valued with the
//! holding user, expiring with the hold. It is an admission filter only:
//! the partial unique index on active holds is the authoritative
//! uniqueness guarantee.

use crate::error::CoreError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct SeatLockCache {
    conn: ConnectionManager,
}

fn seat_key(event_id: Uuid, seat: &str) -> String {
    format!("hold:{event_id}:{seat}")
}

impl SeatLockCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Try to take the lock for one seat. Returns `false` when another
    /// hold already owns it.
    pub async fn try_lock(
        &self,
        event_id: Uuid,
        seat: &str,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, CoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(seat_key(event_id, seat))
            .arg(user_id.to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    /// Drop the lock for one seat so it can be re-held before the TTL
    /// elapses.
    pub async fn unlock(&self, event_id: Uuid, seat: &str) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(seat_key(event_id, seat)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_keys_are_scoped_by_event() {
        let event = Uuid::new_v4();
        assert_eq!(seat_key(event, "A1"), format!("hold:{event}:A1"));
        assert_ne!(seat_key(event, "A1"), seat_key(Uuid::new_v4(), "A1"));
    }
}
