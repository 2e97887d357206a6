//! Read-only catalog lookups.
//!
//! The catalog is an external document store owned by another service;
//! the core only checks event existence and reads per-seat prices.

use crate::error::CoreError;
use mongodb::bson::doc;
use mongodb::{Client, Collection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event document as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub seats: Vec<SeatDoc>,
}

/// One seat inside an event document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatDoc {
    pub number: String,
    #[serde(default)]
    pub row: String,
    #[serde(default)]
    pub section: String,
    pub price: f64,
    #[serde(default)]
    pub available: bool,
}

impl EventDoc {
    /// Resolve the catalog price of one seat.
    pub fn price_for(&self, seat_no: &str) -> Result<Decimal, CoreError> {
        let seat = self
            .seats
            .iter()
            .find(|s| s.number == seat_no)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("seat {seat_no} not in event {}", self.id))
            })?;
        Decimal::try_from(seat.price)
            .map_err(|e| CoreError::Fatal(format!("unrepresentable price for {seat_no}: {e}")))
    }
}

/// Read-only client for the catalog's `events` collection.
#[derive(Clone)]
pub struct CatalogReader {
    events: Collection<EventDoc>,
}

impl CatalogReader {
    /// Connect to the catalog database.
    pub async fn connect(uri: &str) -> Result<Self, CoreError> {
        let client = Client::with_uri_str(uri).await?;
        let events = client.database("tro").collection::<EventDoc>("events");
        Ok(Self { events })
    }

    /// Fetch one event by id, `None` when it does not exist.
    #[tracing::instrument(skip_all, err, name = "Catalog:GetEvent")]
    pub async fn get_event(&self, event_id: Uuid) -> Result<Option<EventDoc>, CoreError> {
        let doc = self
            .events
            .find_one(doc! { "_id": event_id.to_string() })
            .await?;
        Ok(doc)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event_with_seats() -> EventDoc {
        EventDoc {
            id: Uuid::new_v4().to_string(),
            name: "Spring Gala".to_string(),
            venue: "Main Hall".to_string(),
            seats: vec![
                SeatDoc {
                    number: "A1".to_string(),
                    row: "A".to_string(),
                    section: "Floor".to_string(),
                    price: 100.0,
                    available: true,
                },
                SeatDoc {
                    number: "A2".to_string(),
                    row: "A".to_string(),
                    section: "Floor".to_string(),
                    price: 150.5,
                    available: true,
                },
            ],
        }
    }

    #[test]
    fn prices_resolve_per_seat() {
        let event = event_with_seats();
        assert_eq!(event.price_for("A1").unwrap(), Decimal::from(100));
        assert_eq!(
            event.price_for("A2").unwrap(),
            Decimal::try_from(150.5).unwrap()
        );
    }

    #[test]
    fn unknown_seat_is_invalid_input() {
        let event = event_with_seats();
        assert!(matches!(
            event.price_for("Z9"),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
