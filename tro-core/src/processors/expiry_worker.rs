//! Expiry worker processor.
//!
//! Every tick the worker collects holds whose deadline has passed and,
//! per hold: flips it to RELEASED (conditional, so holds consumed by an
//! order in the meantime are skipped), appends a `hold.expired` outbox
//! row in the same transaction, then drops the seat locks from the cache
//! so the seats are re-holdable before the lock TTL elapses.

use crate::cache::SeatLockCache;
use crate::entities::holds::{GetExpiredHolds, Hold};
use crate::entities::outbox::OutboxRecord;
use crate::error::CoreError;
use crate::framework::DatabaseProcessor;
use crate::utils::backoff::EXPIRY_RETRY;
use kanau::processor::Processor;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How often expired holds are swept.
const TICK_INTERVAL: Duration = Duration::from_secs(60);

pub struct ExpiryWorker {
    processor: DatabaseProcessor,
    seat_locks: SeatLockCache,
}

impl ExpiryWorker {
    pub fn new(processor: DatabaseProcessor, seat_locks: SeatLockCache) -> Self {
        Self {
            processor,
            seat_locks,
        }
    }

    /// Run the worker until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("ExpiryWorker started");

        let sweep_shutdown_rx = shutdown_rx.clone();
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("ExpiryWorker received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(TICK_INTERVAL) => {
                    if let Err(e) = self.sweep(&sweep_shutdown_rx).await {
                        error!(error = %e, "Expiry sweep failed");
                    }
                }
            }
        }

        info!("ExpiryWorker shutdown complete");
    }

    /// Release every hold that expired before now.
    async fn sweep(&self, shutdown_rx: &watch::Receiver<bool>) -> Result<(), CoreError> {
        let holds = self
            .processor
            .process(GetExpiredHolds {
                now: OffsetDateTime::now_utc(),
            })
            .await?;

        if holds.is_empty() {
            return Ok(());
        }

        debug!(expired = holds.len(), "Found expired holds");

        for hold in holds {
            if *shutdown_rx.borrow() {
                info!("Shutdown during sweep, remaining holds expire next run");
                break;
            }
            if let Err(e) = self.expire_with_retry(&hold).await {
                error!(
                    hold_id = %hold.id,
                    error = %e,
                    "Failed to process expired hold after retries"
                );
            }
        }

        Ok(())
    }

    /// Process one expired hold, retrying per the expiry policy.
    async fn expire_with_retry(&self, hold: &Hold) -> Result<(), CoreError> {
        let mut attempt = 0u32;
        loop {
            match self.expire_one(hold).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt + 1 < EXPIRY_RETRY.max_attempts => {
                    let delay = EXPIRY_RETRY.delay_for(attempt);
                    warn!(
                        hold_id = %hold.id,
                        attempt = attempt + 1,
                        delay_s = delay.as_secs(),
                        error = %e,
                        "Expired hold processing failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Release one hold and emit its event.
    ///
    /// The release and the outbox append commit together; seat-lock
    /// eviction follows best-effort since the cache entries expire on
    /// their own TTL anyway.
    async fn expire_one(&self, hold: &Hold) -> Result<(), CoreError> {
        let mut tx = self.processor.pool.begin().await.map_err(CoreError::from)?;

        let released = Hold::release_tx(&mut tx, hold.id).await?;
        if !released {
            let _ = tx.rollback().await;
            debug!(hold_id = %hold.id, "Hold already released, skipping");
            return Ok(());
        }

        let record = OutboxRecord::hold_expired(hold.id)?;
        OutboxRecord::insert_tx(&mut tx, &record).await?;
        tx.commit().await.map_err(CoreError::from)?;

        for seat in &hold.seats {
            if let Err(e) = self.seat_locks.unlock(hold.event_id, seat).await {
                warn!(
                    hold_id = %hold.id,
                    seat = %seat,
                    error = %e,
                    "Failed to evict seat lock, cache TTL will reclaim it"
                );
            }
        }

        metrics::counter!("tro_holds_expired_total").increment(1);
        info!(
            hold_id = %hold.id,
            seats = hold.seats.len(),
            "Released expired hold"
        );
        Ok(())
    }
}
