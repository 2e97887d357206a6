//! Wire objects for the holds API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// `POST /v1/holds` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHoldRequest {
    pub event_id: Uuid,
    pub seats: Vec<String>,
    pub user_id: Uuid,
}

/// `POST /v1/holds` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldResponse {
    pub hold_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn expires_at_serializes_as_rfc3339() {
        let response = HoldResponse {
            hold_id: Uuid::nil(),
            expires_at: datetime!(2025-06-01 12:00:00 UTC),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["expires_at"], "2025-06-01T12:00:00Z");
    }

    #[test]
    fn request_parses_from_wire_json() {
        let raw = r#"{
            "event_id": "6b7f2f60-22b5-4b2e-9a3e-3f2a5a3d9c10",
            "seats": ["A2", "A1"],
            "user_id": "91d7a3e4-7c59-4b76-8fd2-44d6d2c2ab01"
        }"#;
        let req: CreateHoldRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.seats, vec!["A2", "A1"]);
    }
}
