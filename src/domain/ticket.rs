//! Ticket verification tokens (the payload encoded into a booking's QR code).
//!
//! A token is `base64(JSON)` of the booking, event and user ids, the ticket
//! count and `HMAC-SHA256(secret, "bookingId|eventId|userId")`. Check-in can
//! re-derive the MAC from the three ids alone, without reading storage.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::signature::{constant_time_eq, hmac_hex};
use super::{Booking, BookingId, EventId, UserId};
use crate::error::ApiError;

/// Decoded contents of a ticket token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketClaims {
    /// Booking the ticket belongs to.
    pub booking_id: BookingId,
    /// Event the ticket admits to.
    pub event_id: EventId,
    /// Booking owner.
    pub user_id: UserId,
    /// Number of admissions.
    pub tickets_booked: u32,
    /// Hex HMAC over the three ids.
    pub verification: String,
}

fn verification_mac(
    secret: &str,
    booking_id: BookingId,
    event_id: EventId,
    user_id: UserId,
) -> Result<String, ApiError> {
    hmac_hex(secret, &format!("{booking_id}|{event_id}|{user_id}"))
}

/// Issues the token for a paid booking.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if signing or encoding fails.
pub fn issue(secret: &str, booking: &Booking) -> Result<String, ApiError> {
    let claims = TicketClaims {
        booking_id: booking.id,
        event_id: booking.event_id,
        user_id: booking.user_id,
        tickets_booked: booking.tickets_booked,
        verification: verification_mac(secret, booking.id, booking.event_id, booking.user_id)?,
    };
    let json = serde_json::to_vec(&claims)
        .map_err(|e| ApiError::Internal(format!("ticket encoding: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Decodes a token and checks its MAC.
///
/// # Errors
///
/// Returns [`ApiError::InvalidTicket`] if the token is not valid base64
/// JSON or the MAC does not match the ids it carries.
pub fn verify(secret: &str, token: &str) -> Result<TicketClaims, ApiError> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|_| ApiError::InvalidTicket("token is not base64".to_string()))?;
    let claims: TicketClaims = serde_json::from_slice(&bytes)
        .map_err(|_| ApiError::InvalidTicket("token payload is malformed".to_string()))?;
    let expected = verification_mac(secret, claims.booking_id, claims.event_id, claims.user_id)?;
    if !constant_time_eq(&expected, &claims.verification) {
        return Err(ApiError::InvalidTicket(
            "verification code does not match".to_string(),
        ));
    }
    Ok(claims)
}
