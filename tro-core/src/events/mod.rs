//! Downstream event definitions.
//!
//! Events leave the system exclusively through the outbox: a business
//! transaction appends a row, the publisher worker routes it to the broker
//! with the event type as routing key and the dedupe key as message id.

pub mod types;

pub use types::{
    HoldExpiredPayload, OrderCreatedPayload, OrderSettledPayload, HOLD_EXPIRED, ORDER_CONFIRMED,
    ORDER_CREATED, ORDER_FAILED,
};
