//! `POST /v1/payments/callback` — settle an order from the payment provider.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kanau::processor::Processor;
use tro_core::entities::orders::{GetOrderById, Order, OrderStatus};
use tro_core::entities::outbox::OutboxRecord;
use tro_core::error::CoreError;
use tro_core::events::{ORDER_CONFIRMED, ORDER_FAILED};
use tro_core::framework::{run_serializable, DatabaseProcessor};
use tro_core::utils::backoff::SERIALIZATION_RETRY;
use tro_sdk::objects::PaymentCallbackRequest;

use super::extractors::SignedCallback;
use super::ApiError;
use crate::state::AppState;

/// Apply the provider's outcome to a pending order.
///
/// No idempotency key is required: the PENDING guard makes the update a
/// no-op on redelivery, and the outbox row is deduped on the provider's
/// transaction id so consumers see one terminal event per payment.
pub(super) async fn payment_callback(
    State(state): State<AppState>,
    SignedCallback(body): SignedCallback<PaymentCallbackRequest>,
) -> Result<Response, ApiError> {
    let (new_status, event_type) = if body.is_success() {
        (OrderStatus::Confirmed, ORDER_CONFIRMED)
    } else {
        (OrderStatus::Failed, ORDER_FAILED)
    };

    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };
    if processor
        .process(GetOrderById {
            order_id: body.order_id,
        })
        .await
        .map_err(settlement_error)?
        .is_none()
    {
        return Err(ApiError::InvalidInput(format!(
            "unknown order {}",
            body.order_id
        )));
    }

    let order_id = body.order_id;
    let transaction_id = body.transaction_id.clone();
    let settled = run_serializable(&state.db, SERIALIZATION_RETRY, |tx| {
        let transaction_id = transaction_id.clone();
        Box::pin(async move {
            let settled = Order::settle_tx(tx, order_id, new_status).await?;
            if settled {
                let record = OutboxRecord::order_settled(
                    order_id,
                    event_type,
                    new_status.as_str(),
                    transaction_id,
                )?;
                OutboxRecord::insert_tx(tx, &record).await?;
            }
            Ok(settled)
        })
    })
    .await
    .map_err(settlement_error)?;

    if settled {
        tracing::info!(
            order_id = %order_id,
            status = new_status.as_str(),
            transaction_id = %body.transaction_id,
            "Order settled by payment callback"
        );
    } else {
        tracing::debug!(
            order_id = %order_id,
            transaction_id = %body.transaction_id,
            "Duplicate payment callback, order already terminal"
        );
    }

    Ok(StatusCode::OK.into_response())
}

/// Map settlement failures for this endpoint, which answers only 400 or
/// 500. Conflict kinds from the store are provider-retriable server
/// trouble here, not a client-visible 409.
fn settlement_error(err: CoreError) -> ApiError {
    match err {
        CoreError::SerializationConflict | CoreError::Conflict => {
            ApiError::Internal("order settlement contention persisted".into())
        }
        other => other.into(),
    }
}
