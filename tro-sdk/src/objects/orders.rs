//! Wire objects for the orders API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status on the wire.
///
/// This is the API/DTO version. For database operations, see
/// `tro_core::entities::orders::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
}

/// `POST /v1/orders` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub event_id: Uuid,
    pub seats: Vec<String>,
    pub user_id: Uuid,
    pub payment_method: String,
}

/// `POST /v1/orders` success body (the order is accepted, not yet settled).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAcceptedResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

/// One sold seat inside an order detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDto {
    pub event_id: Uuid,
    pub seat_no: String,
    pub price: Decimal,
}

/// `GET /v1/orders/{id}` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItemDto>,
    pub total: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            r#""PENDING""#
        );
        assert_eq!(
            serde_json::from_str::<OrderStatus>(r#""CONFIRMED""#).unwrap(),
            OrderStatus::Confirmed
        );
    }

    #[test]
    fn accepted_response_wire_shape() {
        let response = OrderAcceptedResponse {
            order_id: Uuid::nil(),
            status: OrderStatus::Pending,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["order_id"], Uuid::nil().to_string());
    }
}
