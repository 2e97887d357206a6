//! Reservation API handlers.
//!
//! # Endpoints
//!
//! - `POST /v1/holds`             – reserve seats for a bounded window
//! - `POST /v1/orders`            – convert held seats into a pending order
//! - `GET  /v1/orders/{id}`       – fetch an order with its items
//! - `POST /v1/payments/callback` – settle an order from the payment provider

pub mod extractors;
pub mod holds;
pub mod orders;
pub mod payments;

use crate::state::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tro_core::cache::StoredResponse;
use tro_core::error::CoreError;
use tro_sdk::objects::ErrorResponse;

/// Build the `/v1` API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/holds", post(holds::create_hold))
        .route("/orders", post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/payments/callback", post(payments::payment_callback))
}

/// Errors surfaced by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SerializationConflict => Self::Conflict("conflict, try again"),
            CoreError::Conflict => Self::Conflict("conflict"),
            CoreError::NotFound => Self::NotFound("not found"),
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            CoreError::Transient(msg) | CoreError::Fatal(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.to_string()),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Replay a cached idempotent response bit-for-bit.
pub(crate) fn replay(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        stored.body,
    )
        .into_response()
}

/// Serialize a success body, cache it under the idempotency key, and
/// build the final response.
///
/// The cache write happens before the response leaves the handler so a
/// retried request can never observe the side effects without the cached
/// body. A failed write is logged and tolerated: the operation committed,
/// and the retry will surface a conflict instead of a replay.
pub(crate) async fn respond_cached<T: serde::Serialize>(
    state: &AppState,
    key: &str,
    status: StatusCode,
    body: &T,
) -> Result<Response, ApiError> {
    let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Internal(e.to_string()))?;

    let stored = StoredResponse {
        status: status.as_u16(),
        body: bytes.clone(),
    };
    if let Err(e) = state
        .idempotency
        .put(key, &stored, state.config.idempotency_ttl)
        .await
    {
        tracing::warn!(error = %e, "Failed to cache idempotent response");
    }

    Ok((status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// Sort seats lexicographically and drop duplicates.
///
/// Every code path that touches seat locks or hold rows goes through this
/// so concurrent requests always acquire in the same order.
pub(crate) fn normalize_seats(mut seats: Vec<String>) -> Vec<String> {
    seats.sort();
    seats.dedup();
    seats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_are_sorted_and_deduped() {
        let seats = vec![
            "B2".to_string(),
            "A1".to_string(),
            "B2".to_string(),
            "A10".to_string(),
        ];
        assert_eq!(normalize_seats(seats), vec!["A1", "A10", "B2"]);
    }

    #[test]
    fn core_conflicts_map_to_409_kinds() {
        assert!(matches!(
            ApiError::from(CoreError::SerializationConflict),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(CoreError::Conflict),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(CoreError::NotFound),
            ApiError::NotFound(_)
        ));
    }
}
