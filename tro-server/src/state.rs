//! Application state shared across all request handlers.

use crate::config::AppConfig;
use sqlx::PgPool;
use std::sync::Arc;
use tro_core::cache::{IdempotencyStore, SeatLockCache};
use tro_core::catalog::CatalogReader;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc
/// or an internal handle).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Per-seat admission locks.
    pub seat_locks: SeatLockCache,
    /// Cached idempotent responses.
    pub idempotency: IdempotencyStore,
    /// Read-only event catalog.
    pub catalog: CatalogReader,
    /// Validated runtime configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        seat_locks: SeatLockCache,
        idempotency: IdempotencyStore,
        catalog: CatalogReader,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            seat_locks,
            idempotency,
            catalog,
            config,
        }
    }
}
