//! HMAC-SHA256 helpers shared by payment verification and ticket tokens.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded `HMAC-SHA256(secret, message)`.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the MAC cannot be keyed.
pub fn hmac_hex(secret: &str, message: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("hmac key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time, byte-for-byte string comparison.
#[must_use]
pub fn constant_time_eq(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

/// Signature the gateway attaches to a successful checkout:
/// `HMAC-SHA256(secret, order_id + "|" + payment_id)`.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the MAC cannot be keyed.
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> Result<String, ApiError> {
    hmac_hex(secret, &format!("{order_id}|{payment_id}"))
}

/// Checks a gateway checkout signature.
///
/// # Errors
///
/// Returns [`ApiError::InvalidSignature`] on any mismatch.
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), ApiError> {
    let expected = payment_signature(secret, order_id, payment_id)?;
    if constant_time_eq(&expected, signature) {
        Ok(())
    } else {
        Err(ApiError::InvalidSignature)
    }
}
