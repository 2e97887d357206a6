//! Wire objects for the payment provider callback.

use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Callback status value meaning the payment went through; every other
/// value settles the order as failed.
pub const CALLBACK_SUCCEEDED: &str = "SUCCEEDED";

/// `POST /v1/payments/callback` request body.
///
/// `transaction_id` is the provider's id for the payment attempt and
/// doubles as the dedupe key of the resulting outbox event, so the
/// provider may deliver the callback any number of times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallbackRequest {
    pub order_id: Uuid,
    pub status: String,
    pub transaction_id: String,
}

impl Signature for PaymentCallbackRequest {}

impl PaymentCallbackRequest {
    /// Whether the provider reports a successful payment.
    pub fn is_success(&self) -> bool {
        self.status == CALLBACK_SUCCEEDED
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn succeeded_is_the_only_success_status() {
        let mut req = PaymentCallbackRequest {
            order_id: Uuid::new_v4(),
            status: "SUCCEEDED".to_string(),
            transaction_id: "tx1".to_string(),
        };
        assert!(req.is_success());

        for status in ["FAILED_INSUFFICIENT_FUNDS", "succeeded", "", "DECLINED"] {
            req.status = status.to_string();
            assert!(!req.is_success());
        }
    }

    #[test]
    fn parses_provider_payload() {
        let raw = r#"{"order_id":"6b7f2f60-22b5-4b2e-9a3e-3f2a5a3d9c10","status":"SUCCEEDED","transaction_id":"tx1"}"#;
        let req: PaymentCallbackRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.transaction_id, "tx1");
        assert!(req.is_success());
    }
}
