//! Signature algorithm and verification for the payment callback.
//!
//! The payment provider signs every callback body with a shared secret.
//! The wire format for the header is:
//!
//! ```text
//! Tro-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{timestamp}.{json_body}", secret)`.

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Tro-Signature";

/// Maximum allowed age of a signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Marker trait for types that can participate in body signing via
/// [`SignedObject`].
pub trait Signature: for<'de> serde::Deserialize<'de> + serde::Serialize {}

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// A signed callback body carrying its typed payload, timestamp, raw JSON,
/// and HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject<T: Signature> {
    pub body: T,
    pub timestamp: i64,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: Signature> SignedObject<T> {
    /// Create a new signed object.
    ///
    /// Serializes `body` to JSON, computes
    /// `HMAC-SHA256("{timestamp}.{json}", key)`, and returns the assembled
    /// [`SignedObject`].
    pub fn new(body: T, key: &[u8]) -> Result<Self, serde_json::Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Self::new_at(body, key, now)
    }

    fn new_at(body: T, key: &[u8], timestamp: i64) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(&body)?;
        let data = format!("{timestamp}.{json}");
        let signature = ring::hmac::sign(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            data.as_bytes(),
        );
        let signature = signature.as_ref().to_owned().into_boxed_slice();
        Ok(Self {
            body,
            timestamp,
            json,
            signature,
        })
    }

    /// Reconstruct a [`SignedObject`] from a raw `Tro-Signature` header
    /// value and the JSON request body string.
    ///
    /// This parses the header and deserializes the body but does **not**
    /// verify the HMAC — call [`verify`](Self::verify) for that.
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let (timestamp, signature) = parse_signature_header(header_value)?;
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            timestamp,
            json: body_json,
            signature,
        })
    }

    /// Verify the HMAC signature and timestamp freshness, consuming `self`
    /// and returning the authenticated payload.
    pub fn verify(self, key: &[u8]) -> Result<T, SignatureError> {
        let data = format!("{}.{}", self.timestamp, self.json);
        ring::hmac::verify(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            data.as_bytes(),
            self.signature.as_ref(),
        )?;
        check_timestamp(self.timestamp)?;
        Ok(self.body)
    }

    /// Format the full `Tro-Signature` header value (`{timestamp}.{b64}`).
    pub fn to_header(&self) -> String {
        format_signature_header(self.timestamp, &self.signature)
    }
}

/// Parse a `Tro-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let dot_pos = value.find('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = value[..dot_pos]
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(&value[dot_pos + 1..])
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if (now - timestamp).abs() > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::objects::PaymentCallbackRequest;
    use uuid::Uuid;

    const KEY: &[u8] = b"shared-callback-secret";

    fn callback() -> PaymentCallbackRequest {
        PaymentCallbackRequest {
            order_id: Uuid::new_v4(),
            status: "SUCCEEDED".to_string(),
            transaction_id: "tx1".to_string(),
        }
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let body = callback();
        let signed = SignedObject::new(body.clone(), KEY).unwrap();
        let header = signed.to_header();
        let json = signed.json.clone();

        let received =
            SignedObject::<PaymentCallbackRequest>::from_header_and_body(&header, json).unwrap();
        let verified = received.verify(KEY).unwrap();
        assert_eq!(verified, body);
    }

    #[test]
    fn tampered_body_fails_verification() {
        let signed = SignedObject::new(callback(), KEY).unwrap();
        let header = signed.to_header();
        let tampered = signed.json.replace("SUCCEEDED", "FAILED_X");

        let received =
            SignedObject::<PaymentCallbackRequest>::from_header_and_body(&header, tampered)
                .unwrap();
        assert!(matches!(
            received.verify(KEY),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let signed = SignedObject::new(callback(), KEY).unwrap();
        let header = signed.to_header();
        let json = signed.json.clone();

        let received =
            SignedObject::<PaymentCallbackRequest>::from_header_and_body(&header, json).unwrap();
        assert!(matches!(
            received.verify(b"other-secret"),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn stale_signature_is_rejected() {
        let old = time::OffsetDateTime::now_utc().unix_timestamp() - MAX_SIGNATURE_AGE - 1;
        let signed = SignedObject::new_at(callback(), KEY, old).unwrap();
        let header = signed.to_header();
        let json = signed.json.clone();

        let received =
            SignedObject::<PaymentCallbackRequest>::from_header_and_body(&header, json).unwrap();
        assert!(matches!(received.verify(KEY), Err(SignatureError::Expired)));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(matches!(
            parse_signature_header("no-dot-here"),
            Err(SignatureError::InvalidFormat)
        ));
        assert!(matches!(
            parse_signature_header("notanumber.QUJD"),
            Err(SignatureError::InvalidFormat)
        ));
        assert!(matches!(
            parse_signature_header("1700000000.!!!"),
            Err(SignatureError::InvalidBase64)
        ));
    }
}
