//! Typed HTTP client for the reservation API.
//!
//! Used by downstream services and integration harnesses; the payment
//! provider side of the callback can sign bodies with [`SignedObject`].

use crate::objects::{
    CreateHoldRequest, CreateOrderRequest, ErrorResponse, HoldResponse, OrderAcceptedResponse,
    OrderDetailResponse, PaymentCallbackRequest,
};
use crate::signature::{SignedObject, SIGNATURE_HEADER};
use reqwest::{Client, StatusCode};
use url::Url;
use uuid::Uuid;

/// Header carrying the client-chosen idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Errors produced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("api error {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Typed HTTP client for the reservation & ordering service.
#[derive(Debug, Clone)]
pub struct TroClient {
    http: Client,
    base_url: Url,
}

impl TroClient {
    /// Create a new client against the service root URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /v1/holds` — reserve seats for a bounded window.
    pub async fn create_hold(
        &self,
        request: &CreateHoldRequest,
        idempotency_key: &str,
    ) -> Result<HoldResponse, ClientError> {
        let url = self.base_url.join("/v1/holds")?;
        let resp = self
            .http
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(request)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /v1/orders` — convert held seats into a pending order.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
        idempotency_key: &str,
    ) -> Result<OrderAcceptedResponse, ClientError> {
        let url = self.base_url.join("/v1/orders")?;
        let resp = self
            .http
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(request)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /v1/orders/{id}` — fetch an order with its items.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetailResponse, ClientError> {
        let url = self.base_url.join(&format!("/v1/orders/{order_id}"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /v1/payments/callback` — deliver a signed payment outcome.
    pub async fn payment_callback(
        &self,
        request: PaymentCallbackRequest,
        secret: &[u8],
    ) -> Result<(), ClientError> {
        let signed = SignedObject::new(request, secret)?;
        let url = self.base_url.join("/v1/payments/callback")?;
        let resp = self
            .http
            .post(url)
            .header(SIGNATURE_HEADER, signed.to_header())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status,
                message: resp.text().await.unwrap_or_default(),
            })
        }
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let bytes = resp.bytes().await?;
        let message = serde_json::from_slice::<ErrorResponse>(&bytes)
            .map(|e| e.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Api { status, message });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
