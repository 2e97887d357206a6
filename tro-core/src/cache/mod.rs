//! Redis-backed caches.
//!
//! Two concerns share one connection manager: the per-seat admission
//! lock and the idempotency response store. Both are hints layered over
//! the relational store; losing either never compromises correctness.

pub mod idempotency;
pub mod seat_lock;

pub use idempotency::{IdempotencyStore, StoredResponse};
pub use seat_lock::SeatLockCache;

use crate::error::CoreError;
use redis::aio::ConnectionManager;

/// Open a pooled connection manager against the given Redis address
/// (`host:port` or a full `redis://` URL).
pub async fn connect(addr: &str) -> Result<ConnectionManager, CoreError> {
    let url = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{addr}")
    };
    let client = redis::Client::open(url).map_err(CoreError::from)?;
    ConnectionManager::new(client).await.map_err(CoreError::from)
}
