//! `POST /v1/holds` — reserve seats for a bounded window.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use tro_core::entities::holds::Hold;
use tro_core::error::CoreError;
use tro_core::framework::run_serializable;
use tro_core::utils::backoff::SERIALIZATION_RETRY;
use tro_sdk::objects::{CreateHoldRequest, HoldResponse};

use super::extractors::IdempotencyKey;
use super::{normalize_seats, replay, respond_cached, ApiError};
use crate::state::AppState;

/// Create a hold over the requested seats.
///
/// The seat-lock cache rejects contended seats fast and cheaply; the
/// serializable insert against the partial unique index is the
/// authoritative check and stays correct across cache failures, partitions
/// and TTL edge cases.
pub(super) async fn create_hold(
    State(state): State<AppState>,
    IdempotencyKey(key): IdempotencyKey,
    Json(body): Json<CreateHoldRequest>,
) -> Result<Response, ApiError> {
    // 1. Replay if this key already completed
    if let Some(stored) = state.idempotency.get(&key).await.map_err(ApiError::from)? {
        return Ok(replay(stored));
    }

    if body.seats.is_empty() {
        return Err(ApiError::InvalidInput("seats must not be empty".into()));
    }

    // 2. The event must exist in the catalog
    if state
        .catalog
        .get_event(body.event_id)
        .await
        .map_err(ApiError::from)?
        .is_none()
    {
        return Err(ApiError::NotFound("event not found"));
    }

    // 3. Lock ordering discipline
    let seats = normalize_seats(body.seats);
    let hold_ttl = state.config.hold_ttl;

    // 4. Fast-path admission filter
    let mut acquired: Vec<String> = Vec::with_capacity(seats.len());
    for seat in &seats {
        match state
            .seat_locks
            .try_lock(body.event_id, seat, body.user_id, hold_ttl)
            .await
        {
            Ok(true) => acquired.push(seat.clone()),
            Ok(false) => {
                release_acquired(&state, body.event_id, &acquired).await;
                return Err(ApiError::Conflict("seats already held"));
            }
            Err(e) => {
                release_acquired(&state, body.event_id, &acquired).await;
                return Err(e.into());
            }
        }
    }

    // 5. Authoritative insert under serializable isolation
    let hold = Hold::new(body.event_id, seats, body.user_id, hold_ttl);
    let result = run_serializable(&state.db, SERIALIZATION_RETRY, |tx| {
        let hold = hold.clone();
        Box::pin(async move { Hold::insert_tx(tx, &hold).await })
    })
    .await;

    match result {
        Ok(()) => {}
        Err(CoreError::SerializationConflict) => {
            release_acquired(&state, body.event_id, &acquired).await;
            return Err(ApiError::Conflict("conflict, try again"));
        }
        Err(CoreError::Conflict) => {
            release_acquired(&state, body.event_id, &acquired).await;
            return Err(ApiError::Conflict("seats already held"));
        }
        Err(e) => {
            release_acquired(&state, body.event_id, &acquired).await;
            return Err(e.into());
        }
    }

    metrics::counter!("tro_holds_created_total").increment(1);
    tracing::info!(
        hold_id = %hold.id,
        event_id = %hold.event_id,
        seats = hold.seats.len(),
        "Hold created"
    );

    // 6. Cache the response, then reply
    let response = HoldResponse {
        hold_id: hold.id,
        expires_at: hold.expires_at,
    };
    respond_cached(&state, &key, StatusCode::CREATED, &response).await
}

/// Best-effort rollback of the seat locks taken so far.
async fn release_acquired(state: &AppState, event_id: uuid::Uuid, acquired: &[String]) {
    for seat in acquired {
        if let Err(e) = state.seat_locks.unlock(event_id, seat).await {
            tracing::warn!(
                event_id = %event_id,
                seat = %seat,
                error = %e,
                "Failed to release seat lock, cache TTL will reclaim it"
            );
        }
    }
}
