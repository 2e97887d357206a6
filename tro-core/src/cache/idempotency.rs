//! Idempotency response store.
//!
//! Each entry caches the exact status code and body bytes of a completed
//! POST so a retry with the same `Idempotency-Key` replays bit-identical
//! output without re-executing side effects.

use crate::error::CoreError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached response: status code plus verbatim body bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct IdempotencyStore {
    conn: ConnectionManager,
}

fn entry_key(key: &str) -> String {
    format!("idemp:{key}")
}

impl IdempotencyStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Look up a cached response. A miss returns `None`; a hit means the
    /// caller must replay the stored bytes without executing anything.
    pub async fn get(&self, key: &str) -> Result<Option<StoredResponse>, CoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(entry_key(key)).await?;
        match raw {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a response under the key for `ttl`.
    pub async fn put(
        &self,
        key: &str,
        response: &StoredResponse,
        ttl: Duration,
    ) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        let bytes = serde_json::to_vec(response)?;
        let _: () = conn.set_ex(entry_key(key), bytes, ttl.as_secs()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stored_response_round_trips_exact_bytes() {
        let original = StoredResponse {
            status: 201,
            body: br#"{"hold_id":"abc","expires_at":"2025-06-01T12:00:00Z"}"#.to_vec(),
        };
        let bytes = serde_json::to_vec(&original).unwrap();
        let back: StoredResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn entry_keys_are_prefixed() {
        assert_eq!(entry_key("k1"), "idemp:k1");
    }
}
