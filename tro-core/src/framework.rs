//! Database access plumbing.
//!
//! [`DatabaseProcessor`] executes kanau commands in autocommit mode.
//! [`run_serializable`] is the transaction contract for every multi-statement
//! business write: serializable isolation, rollback on any error path, and
//! bounded retry on serialization conflicts.

use crate::error::CoreError;
use crate::utils::backoff::BackoffPolicy;
use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

pub struct DatabaseProcessor {
    pub pool: PgPool,
}

/// Run `op` inside a serializable transaction, retrying the whole closure
/// on serialization conflicts per `policy`.
///
/// The closure must be safe to re-run from scratch: every statement it
/// issued is rolled back before the next attempt. Conflicts surfacing at
/// commit time are retried the same way as in-flight ones. All other
/// errors roll back and propagate unchanged.
pub async fn run_serializable<T, F>(
    pool: &PgPool,
    policy: BackoffPolicy,
    mut op: F,
) -> Result<T, CoreError>
where
    F: for<'t> FnMut(
        &'t mut Transaction<'static, Postgres>,
    ) -> BoxFuture<'t, Result<T, CoreError>>,
{
    let mut attempt = 0u32;
    loop {
        let mut tx = pool.begin().await.map_err(CoreError::from)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;

        let outcome = match op(&mut tx).await {
            Ok(value) => match tx.commit().await {
                Ok(()) => return Ok(value),
                Err(e) => Err(CoreError::from(e)),
            },
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        };

        match outcome {
            Err(CoreError::SerializationConflict) if attempt + 1 < policy.max_attempts => {
                let delay = policy.jittered_delay_for(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "serialization conflict, retrying transaction"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
            Ok(value) => return Ok(value),
        }
    }
}
