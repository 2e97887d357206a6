//! Order entity and its store operations.
//!
//! An order is created PENDING and moves exactly once to CONFIRMED or
//! FAILED. Its items are the durable record of sold seats: a partial
//! unique index over active items enforces one buyer per seat.

use crate::entities::holds::HoldStatus;
use crate::error::CoreError;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `tro_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE", type_name = "order_status")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
}

impl From<OrderStatus> for tro_sdk::objects::OrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Pending => tro_sdk::objects::OrderStatus::Pending,
            OrderStatus::Confirmed => tro_sdk::objects::OrderStatus::Confirmed,
            OrderStatus::Failed => tro_sdk::objects::OrderStatus::Failed,
        }
    }
}

impl From<tro_sdk::objects::OrderStatus> for OrderStatus {
    fn from(value: tro_sdk::objects::OrderStatus) -> Self {
        match value {
            tro_sdk::objects::OrderStatus::Pending => OrderStatus::Pending,
            tro_sdk::objects::OrderStatus::Confirmed => OrderStatus::Confirmed,
            tro_sdk::objects::OrderStatus::Failed => OrderStatus::Failed,
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub event_id: Uuid,
    pub seat_no: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Build a PENDING order from catalog-priced items.
    pub fn new(user_id: Uuid, items: Vec<OrderItem>) -> Self {
        let total_amount = items.iter().map(|i| i.price).sum();
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: OrderStatus::Pending,
            total_amount,
            items,
        }
    }

    /// Insert the order header and all items, then release the matching
    /// ACTIVE holds.
    ///
    /// Item inserts hit the active-seat unique index, so selling a seat
    /// twice surfaces as [`CoreError::Conflict`] and aborts the whole
    /// transaction.
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.total_amount)
        .execute(&mut **tx)
        .await?;

        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO order_items (order_id, event_id, seat_no, price, active) ",
        );
        qb.push_values(order.items.iter(), |mut b, item| {
            b.push_bind(order.id)
                .push_bind(item.event_id)
                .push_bind(&item.seat_no)
                .push_bind(item.price)
                .push_bind(true);
        });
        qb.build().execute(&mut **tx).await?;

        for item in &order.items {
            sqlx::query(
                r#"
                UPDATE holds SET status = $3
                WHERE event_id = $1 AND seat_no = $2 AND status = $4
                "#,
            )
            .bind(item.event_id)
            .bind(&item.seat_no)
            .bind(HoldStatus::Released)
            .bind(HoldStatus::Active)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Move a PENDING order to a terminal status.
    ///
    /// Returns `false` when the order was already terminal, making
    /// duplicate payment callbacks a no-op. A FAILED transition also
    /// deactivates the order's items so their seats become sellable again.
    pub async fn settle_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = $1
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(status)
        .bind(order_id)
        .bind(OrderStatus::Pending)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if status == OrderStatus::Failed {
            sqlx::query("UPDATE order_items SET active = FALSE WHERE order_id = $1")
                .bind(order_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(true)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderHeaderRow {
    id: Uuid,
    user_id: Uuid,
    status: OrderStatus,
    total_amount: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderItemRow {
    event_id: Uuid,
    seat_no: String,
    price: Decimal,
}

#[derive(Debug, Clone)]
/// Get an order with its items by id.
pub struct GetOrderById {
    pub order_id: Uuid,
}

impl Processor<GetOrderById, Result<Option<Order>, CoreError>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderById")]
    async fn process(&self, query: GetOrderById) -> Result<Option<Order>, CoreError> {
        let Some(header) = sqlx::query_as::<_, OrderHeaderRow>(
            r#"
            SELECT id, user_id, status, total_amount
            FROM orders WHERE id = $1
            "#,
        )
        .bind(query.order_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT event_id, seat_no, price
            FROM order_items WHERE order_id = $1
            ORDER BY seat_no
            "#,
        )
        .bind(query.order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Order {
            id: header.id,
            user_id: header.user_id,
            status: header.status,
            total_amount: header.total_amount,
            items: items
                .into_iter()
                .map(|row| OrderItem {
                    event_id: row.event_id,
                    seat_no: row.seat_no,
                    price: row.price,
                })
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(seat: &str, price: i64) -> OrderItem {
        OrderItem {
            event_id: Uuid::new_v4(),
            seat_no: seat.to_string(),
            price: Decimal::from(price),
        }
    }

    #[test]
    fn new_order_sums_item_prices() {
        let order = Order::new(Uuid::new_v4(), vec![item("A1", 100), item("A2", 150)]);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::from(250));
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn empty_order_totals_zero() {
        let order = Order::new(Uuid::new_v4(), Vec::new());
        assert_eq!(order.total_amount, Decimal::ZERO);
    }

    #[test]
    fn status_strings_match_the_wire() {
        assert_eq!(OrderStatus::Pending.as_str(), "PENDING");
        assert_eq!(OrderStatus::Confirmed.as_str(), "CONFIRMED");
        assert_eq!(OrderStatus::Failed.as_str(), "FAILED");
    }
}
