//! Service layer: business logic orchestration.
//!
//! [`EventService`] manages the event catalog, [`BookingService`] owns the
//! booking ledger and its seat holds, and [`PaymentService`] reconciles
//! bookings with the payment gateway. Services are stateless coordinators
//! over the storage traits; every seat release for a booking goes through
//! [`release_held_seats`] so it happens at most once.

pub mod booking_service;
pub mod event_service;
pub mod payment_service;

use crate::domain::Booking;
use crate::error::ApiError;
use crate::persistence::{BookingStore, EventStore};

pub use booking_service::{BookingService, Cancellation, CreatedBooking, StatusUpdate};
pub use event_service::EventService;
pub use payment_service::{
    OrderDetails, PaymentHistory, PaymentService, PaymentSettings, VerifyPayment,
};

/// Hands the booking's seats back to its event unless that already happened.
///
/// Returns `true` if this call performed the release. If the event update
/// fails the claim is reverted, so the next call retries the release.
///
/// # Errors
///
/// Returns an [`ApiError`] if the release flag or the event counters cannot
/// be updated.
pub(crate) async fn release_held_seats(
    events: &dyn EventStore,
    bookings: &dyn BookingStore,
    booking: &Booking,
) -> Result<bool, ApiError> {
    if !bookings.claim_seat_release(booking.id).await? {
        tracing::debug!(booking_id = %booking.id, "seats already released");
        return Ok(false);
    }
    if let Err(err) = events
        .release_seats(booking.event_id, booking.tickets_booked)
        .await
    {
        tracing::error!(
            booking_id = %booking.id,
            event_id = %booking.event_id,
            error = %err,
            "seat release claimed but event update failed"
        );
        if let Err(revert_err) = bookings.revert_seat_release(booking.id).await {
            tracing::error!(
                booking_id = %booking.id,
                error = %revert_err,
                "could not reopen seat release; seats stay held"
            );
        }
        return Err(err);
    }
    tracing::info!(
        booking_id = %booking.id,
        event_id = %booking.event_id,
        seats = booking.tickets_booked,
        "seats released"
    );
    Ok(true)
}
