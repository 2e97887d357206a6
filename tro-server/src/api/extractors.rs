//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `IdempotencyKey` — enforces the `Idempotency-Key` header contract on
//!   mutating endpoints.
//! - `SignedCallback<T>` — verifies the `Tro-Signature` header against the
//!   signed JSON body of the payment callback.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use tro_sdk::signature::{Signature, SignatureError, SignedObject, SIGNATURE_HEADER};

use crate::state::AppState;

/// Header carrying the client-chosen idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Minimum accepted key length.
pub const MIN_KEY_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// IdempotencyKey
// ---------------------------------------------------------------------------

/// The validated `Idempotency-Key` header of a mutating request.
pub struct IdempotencyKey(pub String);

/// Errors produced by the idempotency-key extractor.
#[derive(Debug, thiserror::Error)]
pub enum IdempotencyKeyError {
    #[error("missing Idempotency-Key header")]
    Missing,
    #[error("Idempotency-Key must be at least {MIN_KEY_LENGTH} characters")]
    TooShort,
}

impl IntoResponse for IdempotencyKeyError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Validate a raw header value against the key contract.
pub fn validate_key(raw: &str) -> Result<(), IdempotencyKeyError> {
    if raw.len() < MIN_KEY_LENGTH {
        return Err(IdempotencyKeyError::TooShort);
    }
    Ok(())
}

impl FromRequestParts<AppState> for IdempotencyKey {
    type Rejection = IdempotencyKeyError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(IdempotencyKeyError::Missing)?;
        validate_key(raw)?;
        Ok(Self(raw.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// SignedCallback — payment provider authentication via signed JSON body
// ---------------------------------------------------------------------------

/// An Axum extractor that verifies the `Tro-Signature` header and
/// deserializes + authenticates the JSON request body.
///
/// When no callback secret is configured, verification is skipped and the
/// body is only deserialized.
///
/// # Header format
///
/// ```text
/// Tro-Signature: {unix_timestamp}.{base64_signature}
/// ```
pub struct SignedCallback<T: Signature>(pub T);

/// Errors that can occur during signed-callback verification.
#[derive(Debug, thiserror::Error)]
pub enum SignedCallbackError {
    #[error("missing Tro-Signature header")]
    MissingHeader,
    #[error("invalid Tro-Signature header format")]
    InvalidHeader,
    #[error("invalid signature encoding")]
    InvalidBase64,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
}

impl From<SignatureError> for SignedCallbackError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat => Self::InvalidHeader,
            SignatureError::InvalidBase64 => Self::InvalidBase64,
            SignatureError::Json(e) => Self::JsonError(e),
            SignatureError::SignatureMismatch | SignatureError::Expired => {
                Self::VerificationFailed
            }
        }
    }
}

impl IntoResponse for SignedCallbackError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SignedCallbackError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "missing Tro-Signature header")
            }
            SignedCallbackError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "invalid Tro-Signature header format",
            ),
            SignedCallbackError::InvalidBase64 => {
                (StatusCode::BAD_REQUEST, "invalid signature encoding")
            }
            SignedCallbackError::BodyReadError => {
                (StatusCode::BAD_REQUEST, "failed to read request body")
            }
            SignedCallbackError::JsonError(_) => (StatusCode::BAD_REQUEST, "invalid JSON body"),
            SignedCallbackError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "signature verification failed")
            }
        };
        (status, message).into_response()
    }
}

impl<T: Signature + Send> FromRequest<AppState> for SignedCallback<T> {
    type Rejection = SignedCallbackError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = req
            .headers()
            .get(SIGNATURE_HEADER)
            .map(|v| {
                v.to_str()
                    .map(str::to_owned)
                    .map_err(|_| SignedCallbackError::InvalidHeader)
            })
            .transpose()?;

        let body_bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
            .await
            .map_err(|_| SignedCallbackError::BodyReadError)?;

        let json = String::from_utf8(body_bytes.to_vec())
            .map_err(|_| SignedCallbackError::BodyReadError)?;

        let Some(secret) = state.config.callback_secret.as_deref() else {
            let body: T = serde_json::from_str(&json).map_err(SignedCallbackError::JsonError)?;
            return Ok(Self(body));
        };

        let header_value = header_value.ok_or(SignedCallbackError::MissingHeader)?;
        let signed = SignedObject::<T>::from_header_and_body(&header_value, json)?;
        let verified = signed.verify(secret)?;
        Ok(Self(verified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_shorter_than_sixteen_are_rejected() {
        assert!(validate_key("abc").is_err());
        assert!(validate_key("123456789012345").is_err());
        assert!(validate_key("1234567890123456").is_ok());
        assert!(validate_key("a-much-longer-client-key").is_ok());
    }
}
