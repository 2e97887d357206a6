pub mod callback;
pub mod holds;
pub mod orders;

pub use callback::PaymentCallbackRequest;
pub use holds::{CreateHoldRequest, HoldResponse};
pub use orders::{
    CreateOrderRequest, OrderAcceptedResponse, OrderDetailResponse, OrderItemDto, OrderStatus,
};

pub use crate::signature::{Signature, SignatureError, SignedObject};

use serde::{Deserialize, Serialize};

/// Body of every non-2xx API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
