//! `POST /v1/orders` and `GET /v1/orders/{id}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kanau::processor::Processor;
use tro_core::catalog::EventDoc;
use tro_core::entities::orders::{GetOrderById, Order, OrderItem};
use tro_core::entities::outbox::OutboxRecord;
use tro_core::error::CoreError;
use tro_core::framework::{run_serializable, DatabaseProcessor};
use tro_core::utils::backoff::SERIALIZATION_RETRY;
use tro_sdk::objects::{
    CreateOrderRequest, OrderAcceptedResponse, OrderDetailResponse, OrderItemDto,
};
use uuid::Uuid;

use super::extractors::IdempotencyKey;
use super::{normalize_seats, replay, respond_cached, ApiError};
use crate::state::AppState;

/// Price the requested seats from the catalog.
fn priced_items(event: &EventDoc, event_id: Uuid, seats: &[String]) -> Result<Vec<OrderItem>, CoreError> {
    seats
        .iter()
        .map(|seat| {
            Ok(OrderItem {
                event_id,
                seat_no: seat.clone(),
                price: event.price_for(seat)?,
            })
        })
        .collect()
}

/// Create a PENDING order from held seats.
///
/// The order header, its items, the hold releases and the `order.created`
/// outbox row commit in one serializable transaction; there is no window
/// in which an order exists without its event.
pub(super) async fn create_order(
    State(state): State<AppState>,
    IdempotencyKey(key): IdempotencyKey,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    // 1. Replay if this key already completed
    if let Some(stored) = state.idempotency.get(&key).await.map_err(ApiError::from)? {
        return Ok(replay(stored));
    }

    if body.seats.is_empty() {
        return Err(ApiError::InvalidInput("seats must not be empty".into()));
    }
    if body.payment_method.is_empty() {
        return Err(ApiError::InvalidInput("payment_method must not be empty".into()));
    }

    // 2. Price every seat from the catalog
    let event = state
        .catalog
        .get_event(body.event_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::InvalidInput("event not found".into()))?;

    let seats = normalize_seats(body.seats);
    let items = priced_items(&event, body.event_id, &seats).map_err(ApiError::from)?;
    let order = Order::new(body.user_id, items);

    // 3. Order + items + hold releases + outbox row, atomically
    run_serializable(&state.db, SERIALIZATION_RETRY, |tx| {
        let order = order.clone();
        Box::pin(async move {
            Order::insert_tx(tx, &order).await?;
            let record = OutboxRecord::order_created(order.id)?;
            OutboxRecord::insert_tx(tx, &record).await
        })
    })
    .await
    .map_err(ApiError::from)?;

    metrics::counter!("tro_orders_created_total").increment(1);
    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        total = %order.total_amount,
        "Order accepted"
    );

    // 4. Cache the response, then reply 202
    let response = OrderAcceptedResponse {
        order_id: order.id,
        status: order.status.into(),
    };
    respond_cached(&state, &key, StatusCode::ACCEPTED, &response).await
}

/// Fetch an order with its items.
pub(super) async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let order = processor
        .process(GetOrderById { order_id: id })
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound("order not found"))?;

    let response = OrderDetailResponse {
        order_id: order.id,
        status: order.status.into(),
        items: order
            .items
            .into_iter()
            .map(|item| OrderItemDto {
                event_id: item.event_id,
                seat_no: item.seat_no,
                price: item.price,
            })
            .collect(),
        total: order.total_amount,
    };
    Ok(Json(response).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tro_core::catalog::SeatDoc;

    fn event(seats: &[(&str, f64)]) -> EventDoc {
        EventDoc {
            id: Uuid::new_v4().to_string(),
            name: "Test Event".to_string(),
            venue: String::new(),
            seats: seats
                .iter()
                .map(|(number, price)| SeatDoc {
                    number: (*number).to_string(),
                    row: String::new(),
                    section: String::new(),
                    price: *price,
                    available: true,
                })
                .collect(),
        }
    }

    #[test]
    fn items_are_priced_from_the_catalog() {
        let event = event(&[("A1", 100.0), ("A2", 100.0)]);
        let event_id = Uuid::new_v4();
        let items =
            priced_items(&event, event_id, &["A1".to_string(), "A2".to_string()]).unwrap();
        let order = Order::new(Uuid::new_v4(), items);
        assert_eq!(order.total_amount, Decimal::from(200));
    }

    #[test]
    fn unknown_seat_fails_pricing() {
        let event = event(&[("A1", 100.0)]);
        let result = priced_items(&event, Uuid::new_v4(), &["B7".to_string()]);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
