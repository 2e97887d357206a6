//! Event payloads and routing keys.
//!
//! Payloads carry identifiers rather than full aggregates; consumers
//! re-fetch current state when they need more than the id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing key for freshly created orders.
pub const ORDER_CREATED: &str = "order.created";
/// Routing key for orders confirmed by the payment provider.
pub const ORDER_CONFIRMED: &str = "order.confirmed";
/// Routing key for orders failed by the payment provider.
pub const ORDER_FAILED: &str = "order.failed";
/// Routing key for holds released by the expiry worker.
pub const HOLD_EXPIRED: &str = "hold.expired";

/// Payload for [`ORDER_CREATED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedPayload {
    pub order_id: Uuid,
}

/// Payload for [`ORDER_CONFIRMED`] and [`ORDER_FAILED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettledPayload {
    pub order_id: Uuid,
    pub status: String,
}

/// Payload for [`HOLD_EXPIRED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldExpiredPayload {
    pub hold_id: Uuid,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn order_created_wire_shape() {
        let order_id = Uuid::new_v4();
        let json = serde_json::to_value(OrderCreatedPayload { order_id }).unwrap();
        assert_eq!(json, serde_json::json!({ "order_id": order_id.to_string() }));
    }

    #[test]
    fn settled_payload_round_trips() {
        let payload = OrderSettledPayload {
            order_id: Uuid::new_v4(),
            status: "CONFIRMED".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: OrderSettledPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
