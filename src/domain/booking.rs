//! Booking records and their lifecycle states.
//!
//! A booking is created in `(confirmed, pending)` with its seats already
//! held, and moves forward only: to `(confirmed, completed)` on verified
//! payment, to `(cancelled, failed)` on payment failure, or to
//! `(cancelled, _)` on user cancellation. Records are never deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{BookingId, Event, EventId, UserId};
use crate::error::ApiError;

/// Maximum tickets in a single booking.
pub const MAX_TICKETS_PER_BOOKING: u32 = 10;

const MAX_SPECIAL_REQUESTS_LEN: usize = 500;

/// Payment side of the booking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Seats held, payment not yet confirmed.
    Pending,
    /// Gateway payment verified.
    Completed,
    /// Payment failed or was abandoned.
    Failed,
    /// Paid and later refunded on cancellation.
    Refunded,
}

/// Booking side of the booking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Booking stands (provisionally while payment is pending).
    Confirmed,
    /// Booking was cancelled; its seats have been released.
    Cancelled,
    /// Event took place.
    Completed,
}

macro_rules! text_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the stored text form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ApiError::InvalidRequest(format!(
                        "unknown {}: {other}",
                        stringify!($ty)
                    ))),
                }
            }
        }
    };
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

text_enum!(BookingStatus {
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

/// How the customer paid, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debit or credit card.
    Card,
    /// Net banking.
    Netbanking,
    /// UPI.
    Upi,
    /// Wallet.
    Wallet,
    /// Any other method the gateway supports (EMI, pay-later, ...).
    Other,
}

impl PaymentMethod {
    /// Maps a gateway method string onto a known method.
    #[must_use]
    pub fn from_gateway(method: &str) -> Self {
        match method {
            "card" => Self::Card,
            "netbanking" => Self::Netbanking,
            "upi" => Self::Upi,
            "wallet" => Self::Wallet,
            _ => Self::Other,
        }
    }
}

/// Gateway references, filled in as payment progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// Gateway order id, set by order creation.
    pub order_id: Option<String>,
    /// Gateway payment id, set by verification.
    pub payment_id: Option<String>,
    /// Signature supplied with the verified payment.
    pub signature: Option<String>,
    /// Payment method.
    pub method: Option<PaymentMethod>,
    /// Bank reference or gateway transaction id.
    pub transaction_id: Option<String>,
}

/// One ticket holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attendee {
    /// Name printed on the ticket.
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// Age, if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
}

impl Attendee {
    /// Placeholder attendee for ticket `index` (0-based).
    #[must_use]
    pub fn placeholder(index: u32) -> Self {
        Self {
            name: format!("Attendee {}", index + 1),
            email: String::new(),
            phone: String::new(),
            age: None,
        }
    }
}

/// Refund granted on cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    /// Always `true` once a record exists.
    pub is_refunded: bool,
    /// Refunded amount in minor units.
    pub amount: i64,
    /// When the refund was granted.
    pub date: DateTime<Utc>,
    /// Why the refund was granted.
    pub reason: String,
}

/// A booking of one or more tickets for an event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Owner of the booking.
    pub user_id: UserId,
    /// Booked event.
    pub event_id: EventId,
    /// Number of tickets (1-10).
    pub tickets_booked: u32,
    /// Event price times tickets, captured at booking time.
    pub total_amount: i64,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Booking state.
    pub booking_status: BookingStatus,
    /// Gateway references.
    pub payment_details: PaymentDetails,
    /// One entry per ticket.
    pub attendee_details: Vec<Attendee>,
    /// Free-form requests from the customer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Ticket verification token, set once payment is confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    /// Refund granted on cancellation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundRecord>,
    /// Whether the held seats have been handed back to the event.
    pub seats_released: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Caller input for a new booking.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// Event to book.
    pub event_id: EventId,
    /// Number of tickets.
    pub tickets_booked: u32,
    /// Optional attendee list; synthesized when empty.
    pub attendee_details: Vec<Attendee>,
    /// Optional special requests.
    pub special_requests: Option<String>,
}

impl BookingRequest {
    /// Validates ticket count, attendees and special requests.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] describing the first violation.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.tickets_booked == 0 || self.tickets_booked > MAX_TICKETS_PER_BOOKING {
            return Err(ApiError::InvalidRequest(format!(
                "tickets must be between 1 and {MAX_TICKETS_PER_BOOKING}"
            )));
        }
        if !self.attendee_details.is_empty()
            && self.attendee_details.len() != self.tickets_booked as usize
        {
            return Err(ApiError::InvalidRequest(format!(
                "expected {} attendees, got {}",
                self.tickets_booked,
                self.attendee_details.len()
            )));
        }
        if self
            .attendee_details
            .iter()
            .any(|attendee| attendee.name.trim().is_empty())
        {
            return Err(ApiError::InvalidRequest(
                "attendee name is required".to_string(),
            ));
        }
        if let Some(requests) = &self.special_requests
            && requests.chars().count() > MAX_SPECIAL_REQUESTS_LEN
        {
            return Err(ApiError::InvalidRequest(format!(
                "special requests cannot exceed {MAX_SPECIAL_REQUESTS_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl Booking {
    /// Builds a pending booking for `owner` against `event`, snapshotting
    /// the event price and filling in placeholder attendees.
    ///
    /// The caller is responsible for having reserved the seats.
    #[must_use]
    pub fn new(owner: UserId, event: &Event, request: BookingRequest, now: DateTime<Utc>) -> Self {
        let attendee_details = if request.attendee_details.is_empty() {
            (0..request.tickets_booked)
                .map(Attendee::placeholder)
                .collect()
        } else {
            request.attendee_details
        };
        Self {
            id: BookingId::new(),
            user_id: owner,
            event_id: event.id,
            tickets_booked: request.tickets_booked,
            total_amount: event.price.saturating_mul(i64::from(request.tickets_booked)),
            payment_status: PaymentStatus::Pending,
            booking_status: BookingStatus::Confirmed,
            payment_details: PaymentDetails::default(),
            attendee_details,
            special_requests: request.special_requests,
            qr_code: None,
            refund: None,
            seats_released: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Short display code, `BK` followed by the last six hex digits of the id.
    #[must_use]
    pub fn booking_code(&self) -> String {
        let simple = self.id.as_uuid().simple().to_string();
        let tail = simple.get(simple.len().saturating_sub(6)..).unwrap_or_default();
        format!("BK{}", tail.to_uppercase())
    }

    /// `true` for a confirmed and paid booking.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.booking_status == BookingStatus::Confirmed
            && self.payment_status == PaymentStatus::Completed
    }

    /// `true` while the booking still waits for a payment.
    #[must_use]
    pub fn awaits_payment(&self) -> bool {
        self.booking_status == BookingStatus::Confirmed
            && self.payment_status == PaymentStatus::Pending
    }

    /// `true` once the booking was cancelled, its payment failed or it was
    /// refunded. Nothing moves a booking out of these states.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.booking_status == BookingStatus::Cancelled
            || matches!(
                self.payment_status,
                PaymentStatus::Failed | PaymentStatus::Refunded
            )
    }

    /// Applies a manual status change, moving forward only.
    ///
    /// Allowed moves are `confirmed -> completed` for the booking and
    /// `pending -> completed -> refunded` for the payment, all admin only.
    /// Cancellation and payment failure have their own operations because
    /// they release seats. Setting a field to its current value is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidState`] for closed bookings and backward or
    /// seat-affecting moves, and [`ApiError::Forbidden`] when a non-admin
    /// requests a real change. Nothing is modified on error.
    pub fn set_status(
        &mut self,
        booking_status: Option<BookingStatus>,
        payment_status: Option<PaymentStatus>,
        by_admin: bool,
    ) -> Result<(), ApiError> {
        let booking_status = booking_status.filter(|status| *status != self.booking_status);
        let payment_status = payment_status.filter(|status| *status != self.payment_status);
        if booking_status.is_none() && payment_status.is_none() {
            return Ok(());
        }
        if self.is_closed() {
            return Err(ApiError::InvalidState(format!(
                "booking is closed ({} / {})",
                self.booking_status, self.payment_status
            )));
        }
        if let Some(next) = booking_status {
            match (self.booking_status, next) {
                (BookingStatus::Confirmed, BookingStatus::Completed) => {}
                (_, BookingStatus::Cancelled) => {
                    return Err(ApiError::InvalidState(
                        "use cancellation to cancel a booking".to_string(),
                    ));
                }
                (from, to) => {
                    return Err(ApiError::InvalidState(format!(
                        "booking status cannot move from {from} to {to}"
                    )));
                }
            }
        }
        if let Some(next) = payment_status {
            match (self.payment_status, next) {
                (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded) => {}
                (_, PaymentStatus::Failed) => {
                    return Err(ApiError::InvalidState(
                        "use the payment failure operation to fail a payment".to_string(),
                    ));
                }
                (from, to) => {
                    return Err(ApiError::InvalidState(format!(
                        "payment status cannot move from {from} to {to}"
                    )));
                }
            }
        }
        if !by_admin {
            return Err(ApiError::Forbidden);
        }
        if let Some(next) = booking_status {
            self.booking_status = next;
        }
        if let Some(next) = payment_status {
            self.payment_status = next;
        }
        Ok(())
    }
}
