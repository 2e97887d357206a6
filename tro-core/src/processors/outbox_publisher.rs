//! Outbox publisher processor.
//!
//! Every tick the publisher claims a batch of NEW outbox rows with a
//! skip-locked scan, publishes each to the broker with bounded retries,
//! and marks acknowledged rows PUBLISHED by primary key. Rows that keep
//! failing stay NEW and are retried next tick until the total attempt
//! budget is spent, at which point they are parked as FAILED.
//!
//! Multiple publishers can run side by side; the skip-locked scan
//! partitions the queue between them. Per-aggregate ordering is not
//! preserved: consumers dedupe on the message id and rely on the
//! monotone semantics of the event types.

use crate::entities::outbox::{
    GetUnpublishedOutbox, IncrementOutboxAttempts, MarkOutboxFailed, MarkOutboxPublished,
    OutboxRecord,
};
use crate::error::CoreError;
use crate::framework::DatabaseProcessor;
use crate::broker::EventPublisher;
use crate::utils::backoff::BROKER_PUBLISH_RETRY;
use kanau::processor::Processor;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How often the outbox is drained.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum rows claimed per tick.
const BATCH_SIZE: i64 = 100;

/// Total publish attempts across ticks before a row is parked as FAILED.
const MAX_TOTAL_ATTEMPTS: i32 = 15;

pub struct OutboxPublisher {
    processor: DatabaseProcessor,
    publisher: EventPublisher,
}

impl OutboxPublisher {
    pub fn new(processor: DatabaseProcessor, publisher: EventPublisher) -> Self {
        Self {
            processor,
            publisher,
        }
    }

    /// Run the publisher until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("OutboxPublisher started");

        let batch_shutdown_rx = shutdown_rx.clone();
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("OutboxPublisher received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(TICK_INTERVAL) => {
                    if let Err(e) = self.publish_batch(&batch_shutdown_rx).await {
                        error!(error = %e, "Failed to drain outbox batch");
                    }
                }
            }
        }

        info!("OutboxPublisher shutdown complete");
    }

    /// Drain one batch of NEW rows.
    async fn publish_batch(&self, shutdown_rx: &watch::Receiver<bool>) -> Result<(), CoreError> {
        let records = self
            .processor
            .process(GetUnpublishedOutbox { limit: BATCH_SIZE })
            .await?;

        if records.is_empty() {
            return Ok(());
        }

        debug!(batch = records.len(), "Claimed outbox rows");

        for record in records {
            if *shutdown_rx.borrow() {
                info!("Shutdown during batch, leaving remaining rows for next run");
                break;
            }

            match self.publish_with_retry(&record).await {
                Ok(()) => {
                    self.processor
                        .process(MarkOutboxPublished {
                            id: record.id,
                            published_at: OffsetDateTime::now_utc(),
                        })
                        .await?;
                    metrics::counter!("tro_outbox_published_total").increment(1);
                }
                Err(e) => {
                    let attempts = self
                        .processor
                        .process(IncrementOutboxAttempts { id: record.id })
                        .await?;
                    if attempts >= MAX_TOTAL_ATTEMPTS {
                        self.processor
                            .process(MarkOutboxFailed { id: record.id })
                            .await?;
                        metrics::counter!("tro_outbox_failed_total").increment(1);
                        error!(
                            outbox_id = %record.id,
                            event_type = %record.event_type,
                            attempts,
                            error = %e,
                            "Outbox row exhausted its publish budget, marked FAILED"
                        );
                    } else {
                        warn!(
                            outbox_id = %record.id,
                            event_type = %record.event_type,
                            attempts,
                            error = %e,
                            "Publish failed, row stays NEW for next tick"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Publish one row, retrying per the broker policy within this tick.
    async fn publish_with_retry(&self, record: &OutboxRecord) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(&record.payload_json)?;
        let mut attempt = 0u32;
        loop {
            match self
                .publisher
                .publish(&record.event_type, &record.dedupe_key, &payload)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if attempt + 1 < BROKER_PUBLISH_RETRY.max_attempts => {
                    let delay = BROKER_PUBLISH_RETRY.delay_for(attempt);
                    warn!(
                        outbox_id = %record.id,
                        attempt = attempt + 1,
                        delay_s = delay.as_secs(),
                        error = %e,
                        "Publish attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
