//! Booking ledger service: creation with seat holds, cancellation with
//! refunds, status updates and reads.

use std::sync::Arc;

use chrono::Utc;

use super::release_held_seats;
use crate::domain::refund::compute_refund;
use crate::domain::{
    Booking, BookingId, BookingRequest, BookingStatus, Event, PaymentStatus, RefundRecord,
    Requester, UserId,
};
use crate::error::ApiError;
use crate::persistence::{BookingFilter, BookingStore, EventStore, Page, Paged};

const CANCELLATION_REASON: &str = "User cancellation";

/// A freshly created booking together with the event it holds seats on.
#[derive(Debug, Clone)]
pub struct CreatedBooking {
    /// The pending booking.
    pub booking: Booking,
    /// The event after the reservation.
    pub event: Event,
}

/// Outcome of a cancellation.
#[derive(Debug, Clone)]
pub struct Cancellation {
    /// Refund granted, in minor units.
    pub refund_amount: i64,
    /// The cancelled booking.
    pub booking: Booking,
}

/// Status fields to overwrite. `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusUpdate {
    /// New booking status.
    pub booking_status: Option<BookingStatus>,
    /// New payment status.
    pub payment_status: Option<PaymentStatus>,
}

/// Orchestrates the booking lifecycle against the event inventory.
///
/// A booking only exists while its seats are held: creation reserves
/// first and compensates if the booking cannot be stored, and every
/// cancellation releases exactly once.
#[derive(Debug, Clone)]
pub struct BookingService {
    events: Arc<dyn EventStore>,
    bookings: Arc<dyn BookingStore>,
}

impl BookingService {
    /// Creates a new `BookingService`.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { events, bookings }
    }

    /// Reserves seats and records a pending booking for the requester.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for invalid input, any
    /// reservation error from the event store, or the storage error that
    /// prevented the booking from being saved (after releasing the seats).
    pub async fn create_booking(
        &self,
        requester: &Requester,
        request: BookingRequest,
    ) -> Result<CreatedBooking, ApiError> {
        request.validate()?;
        let now = Utc::now();
        let event_id = request.event_id;
        let tickets = request.tickets_booked;

        let event = self.events.reserve_seats(event_id, tickets, now).await?;
        tracing::info!(%event_id, seats = tickets, "seats reserved");

        let booking = Booking::new(requester.user_id, &event, request, now);
        let booking_id = booking.id;
        match self.bookings.insert_booking(booking).await {
            Ok(booking) => {
                tracing::info!(
                    %booking_id,
                    %event_id,
                    user_id = %requester.user_id,
                    total_amount = booking.total_amount,
                    "booking created"
                );
                Ok(CreatedBooking { booking, event })
            }
            Err(err) => {
                tracing::warn!(%booking_id, %event_id, error = %err, "booking not stored, releasing seats");
                if let Err(release_err) = self.events.release_seats(event_id, tickets).await {
                    tracing::error!(%event_id, error = %release_err, "compensating seat release failed");
                }
                Err(err)
            }
        }
    }

    /// Loads a booking visible to the requester.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`] or [`ApiError::Forbidden`].
    pub async fn get_booking(
        &self,
        requester: &Requester,
        id: BookingId,
    ) -> Result<Booking, ApiError> {
        let booking = self.load(id).await?;
        requester.ensure_access(booking.user_id)?;
        Ok(booking)
    }

    /// Lists one page of a user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] unless the requester is that user or
    /// an admin.
    pub async fn list_for_user(
        &self,
        requester: &Requester,
        user_id: UserId,
        booking_status: Option<BookingStatus>,
        payment_status: Option<PaymentStatus>,
        page: Page,
    ) -> Result<Paged<Booking>, ApiError> {
        requester.ensure_access(user_id)?;
        let filter = BookingFilter {
            user_id: Some(user_id),
            event_id: None,
            booking_status,
            payment_status,
        };
        self.bookings.list_bookings(&filter, page).await
    }

    /// Lists one page of the bookings matching `filter` (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins.
    pub async fn list_all(
        &self,
        requester: &Requester,
        filter: &BookingFilter,
        page: Page,
    ) -> Result<Paged<Booking>, ApiError> {
        requester.ensure_admin()?;
        self.bookings.list_bookings(filter, page).await
    }

    /// Cancels a booking before its event starts, granting the refund the
    /// cancellation schedule allows and releasing the seats.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`], [`ApiError::Forbidden`],
    /// [`ApiError::InvalidState`] if the booking is already cancelled or
    /// the event has started, or a storage error. Calling it again on a
    /// cancelled booking whose seats were never handed back retries the
    /// release.
    pub async fn cancel_booking(
        &self,
        requester: &Requester,
        id: BookingId,
    ) -> Result<Cancellation, ApiError> {
        let booking = self.load(id).await?;
        requester.ensure_access(booking.user_id)?;
        if booking.booking_status == BookingStatus::Cancelled && !booking.seats_released {
            return self.finish_cancellation(booking).await;
        }
        ensure_not_cancelled(&booking)?;

        let event = self
            .events
            .get_event(booking.event_id)
            .await?
            .ok_or(ApiError::EventNotFound)?;
        let now = Utc::now();
        if event.has_started(now) {
            return Err(ApiError::InvalidState(
                "cannot cancel a booking for an event that has already started".to_string(),
            ));
        }

        let refund_amount = compute_refund(booking.total_amount, event.starts_at, now);
        let mut booking = self
            .bookings
            .update_booking(
                id,
                Box::new(move |booking: &mut Booking| {
                    ensure_not_cancelled(booking)?;
                    booking.booking_status = BookingStatus::Cancelled;
                    if refund_amount > 0 {
                        booking.refund = Some(RefundRecord {
                            is_refunded: true,
                            amount: refund_amount,
                            date: now,
                            reason: CANCELLATION_REASON.to_string(),
                        });
                        if booking.payment_status == PaymentStatus::Completed {
                            booking.payment_status = PaymentStatus::Refunded;
                        }
                    }
                    booking.updated_at = now;
                    Ok(())
                }),
            )
            .await?;

        release_held_seats(self.events.as_ref(), self.bookings.as_ref(), &booking).await?;
        booking.seats_released = true;

        tracing::info!(
            booking_id = %id,
            event_id = %booking.event_id,
            refund_amount,
            "booking cancelled"
        );
        Ok(Cancellation {
            refund_amount,
            booking,
        })
    }

    /// Moves status fields forward without touching the seat inventory.
    ///
    /// See [`Booking::set_status`] for the allowed moves.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if no field is set,
    /// [`ApiError::BookingNotFound`], [`ApiError::Forbidden`] or
    /// [`ApiError::InvalidState`] for a move the booking does not allow.
    pub async fn update_status(
        &self,
        requester: &Requester,
        id: BookingId,
        update: StatusUpdate,
    ) -> Result<Booking, ApiError> {
        if update.booking_status.is_none() && update.payment_status.is_none() {
            return Err(ApiError::InvalidRequest(
                "at least one of status or paymentStatus is required".to_string(),
            ));
        }
        let booking = self.load(id).await?;
        requester.ensure_access(booking.user_id)?;

        let by_admin = requester.is_admin();
        let now = Utc::now();
        let booking = self
            .bookings
            .update_booking(
                id,
                Box::new(move |booking: &mut Booking| {
                    booking.set_status(update.booking_status, update.payment_status, by_admin)?;
                    booking.updated_at = now;
                    Ok(())
                }),
            )
            .await?;
        tracing::info!(
            booking_id = %id,
            booking_status = %booking.booking_status,
            payment_status = %booking.payment_status,
            "booking status updated"
        );
        Ok(booking)
    }

    /// Completes a cancellation whose seat release did not go through.
    async fn finish_cancellation(&self, mut booking: Booking) -> Result<Cancellation, ApiError> {
        release_held_seats(self.events.as_ref(), self.bookings.as_ref(), &booking).await?;
        booking.seats_released = true;
        let refund_amount = booking.refund.as_ref().map_or(0, |refund| refund.amount);
        tracing::info!(booking_id = %booking.id, "pending seat release completed");
        Ok(Cancellation {
            refund_amount,
            booking,
        })
    }

    async fn load(&self, id: BookingId) -> Result<Booking, ApiError> {
        self.bookings
            .get_booking(id)
            .await?
            .ok_or(ApiError::BookingNotFound)
    }
}

fn ensure_not_cancelled(booking: &Booking) -> Result<(), ApiError> {
    if booking.booking_status == BookingStatus::Cancelled {
        return Err(ApiError::InvalidState(
            "booking is already cancelled".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::domain::event::tests::sample_event;
    use crate::domain::{EventId, Role};
    use crate::persistence::{MemoryBookingStore, MemoryEventStore};
    use crate::service::tests::FlakyEvents;

    struct Fixture {
        events: Arc<MemoryEventStore>,
        service: BookingService,
        event_id: EventId,
    }

    async fn fixture(seats: u32, price: i64, starts_in: Duration) -> Fixture {
        let events = Arc::new(MemoryEventStore::new());
        let bookings = Arc::new(MemoryBookingStore::new());
        let event = assert_ok!(events.insert_event(sample_event(seats, price, starts_in)).await);
        let service = BookingService::new(
            Arc::clone(&events) as Arc<dyn EventStore>,
            bookings as Arc<dyn BookingStore>,
        );
        Fixture {
            events,
            service,
            event_id: event.id,
        }
    }

    fn request(event_id: EventId, tickets: u32) -> BookingRequest {
        BookingRequest {
            event_id,
            tickets_booked: tickets,
            attendee_details: Vec::new(),
            special_requests: None,
        }
    }

    fn user() -> Requester {
        Requester::new(UserId::new(), Role::User)
    }

    async fn seats_booked(fixture: &Fixture) -> u32 {
        let Ok(Some(event)) = fixture.events.get_event(fixture.event_id).await else {
            panic!("event missing");
        };
        event.seats.booked()
    }

    #[tokio::test]
    async fn create_holds_seats_and_snapshots_price() {
        let fx = fixture(10, 100_000, Duration::days(10)).await;
        let created = assert_ok!(fx.service.create_booking(&user(), request(fx.event_id, 3)).await);
        assert_eq!(created.booking.total_amount, 300_000);
        assert!(created.booking.awaits_payment());
        assert_eq!(created.event.seats.available(), 7);
        assert_eq!(seats_booked(&fx).await, 3);
    }

    #[tokio::test]
    async fn invalid_ticket_count_holds_nothing() {
        let fx = fixture(10, 100, Duration::days(10)).await;
        let err = assert_err!(fx.service.create_booking(&user(), request(fx.event_id, 11)).await);
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(seats_booked(&fx).await, 0);
    }

    #[tokio::test]
    async fn insufficient_seats_is_reported() {
        let fx = fixture(2, 100, Duration::days(10)).await;
        let err = assert_err!(fx.service.create_booking(&user(), request(fx.event_id, 3)).await);
        assert!(matches!(
            err,
            ApiError::InsufficientSeats {
                requested: 3,
                available: 2
            }
        ));
    }

    #[tokio::test]
    async fn cancel_ten_days_out_refunds_ninety_percent() {
        let fx = fixture(10, 100_000, Duration::days(10)).await;
        let owner = user();
        let created = assert_ok!(fx.service.create_booking(&owner, request(fx.event_id, 1)).await);

        let cancellation = assert_ok!(fx.service.cancel_booking(&owner, created.booking.id).await);
        assert_eq!(cancellation.refund_amount, 90_000);
        assert_eq!(cancellation.booking.booking_status, BookingStatus::Cancelled);
        let Some(refund) = cancellation.booking.refund else {
            panic!("refund record missing");
        };
        assert_eq!(refund.amount, 90_000);
        assert_eq!(refund.reason, "User cancellation");
        assert_eq!(seats_booked(&fx).await, 0);
    }

    #[tokio::test]
    async fn cancel_inside_three_days_grants_no_refund() {
        let fx = fixture(10, 100_000, Duration::days(2)).await;
        let owner = user();
        let created = assert_ok!(fx.service.create_booking(&owner, request(fx.event_id, 2)).await);

        let cancellation = assert_ok!(fx.service.cancel_booking(&owner, created.booking.id).await);
        assert_eq!(cancellation.refund_amount, 0);
        assert!(cancellation.booking.refund.is_none());
        assert_eq!(seats_booked(&fx).await, 0);
    }

    #[tokio::test]
    async fn cancel_twice_releases_once() {
        let fx = fixture(10, 100, Duration::days(10)).await;
        let owner = user();
        let first = assert_ok!(fx.service.create_booking(&owner, request(fx.event_id, 2)).await);
        let _second = assert_ok!(fx.service.create_booking(&owner, request(fx.event_id, 3)).await);
        assert_eq!(seats_booked(&fx).await, 5);

        assert_ok!(fx.service.cancel_booking(&owner, first.booking.id).await);
        let err = assert_err!(fx.service.cancel_booking(&owner, first.booking.id).await);
        assert!(matches!(err, ApiError::InvalidState(_)));
        assert_eq!(seats_booked(&fx).await, 3);
    }

    #[tokio::test]
    async fn strangers_are_forbidden() {
        let fx = fixture(10, 100, Duration::days(10)).await;
        let owner = user();
        let created = assert_ok!(fx.service.create_booking(&owner, request(fx.event_id, 1)).await);
        let stranger = user();

        assert!(matches!(
            fx.service.cancel_booking(&stranger, created.booking.id).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            fx.service.get_booking(&stranger, created.booking.id).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            fx.service
                .list_for_user(&stranger, owner.user_id, None, None, Page::ALL)
                .await,
            Err(ApiError::Forbidden)
        ));

        let admin = Requester::new(UserId::new(), Role::Admin);
        let listed = assert_ok!(
            fx.service
                .list_for_user(&admin, owner.user_id, None, None, Page::ALL)
                .await
        );
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items.len(), 1);
    }

    #[tokio::test]
    async fn status_update_leaves_seats_alone() {
        let fx = fixture(10, 100, Duration::days(10)).await;
        let owner = user();
        let created = assert_ok!(fx.service.create_booking(&owner, request(fx.event_id, 4)).await);

        let update = StatusUpdate {
            booking_status: Some(BookingStatus::Completed),
            payment_status: None,
        };
        let err = assert_err!(
            fx.service
                .update_status(&owner, created.booking.id, update)
                .await
        );
        assert!(matches!(err, ApiError::Forbidden));

        let admin = Requester::new(UserId::new(), Role::Admin);
        let updated = assert_ok!(
            fx.service
                .update_status(&admin, created.booking.id, update)
                .await
        );
        assert_eq!(updated.booking_status, BookingStatus::Completed);
        assert_eq!(updated.payment_status, PaymentStatus::Pending);
        assert_eq!(seats_booked(&fx).await, 4);

        let err = assert_err!(
            fx.service
                .update_status(&owner, created.booking.id, StatusUpdate::default())
                .await
        );
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_revived() {
        let fx = fixture(1, 100, Duration::days(10)).await;
        let first = user();
        let created = assert_ok!(fx.service.create_booking(&first, request(fx.event_id, 1)).await);
        assert_ok!(fx.service.cancel_booking(&first, created.booking.id).await);

        let second = user();
        assert_ok!(fx.service.create_booking(&second, request(fx.event_id, 1)).await);

        let revive = StatusUpdate {
            booking_status: Some(BookingStatus::Confirmed),
            payment_status: Some(PaymentStatus::Pending),
        };
        for requester in [first, Requester::new(UserId::new(), Role::Admin)] {
            let err = assert_err!(
                fx.service
                    .update_status(&requester, created.booking.id, revive)
                    .await
            );
            assert!(matches!(err, ApiError::InvalidState(_)));
        }
        let booking = assert_ok!(fx.service.get_booking(&first, created.booking.id).await);
        assert_eq!(booking.booking_status, BookingStatus::Cancelled);
        assert_eq!(seats_booked(&fx).await, 1);
    }

    #[tokio::test]
    async fn cancel_retries_a_release_that_failed() {
        let events = Arc::new(FlakyEvents::default());
        let event = assert_ok!(
            events
                .insert_event(sample_event(10, 100_000, Duration::days(10)))
                .await
        );
        let service = BookingService::new(
            Arc::clone(&events) as Arc<dyn EventStore>,
            Arc::new(MemoryBookingStore::new()) as Arc<dyn BookingStore>,
        );
        let owner = user();
        let created = assert_ok!(service.create_booking(&owner, request(event.id, 1)).await);

        events.fail_releases(true);
        assert_err!(service.cancel_booking(&owner, created.booking.id).await);
        let held = assert_ok!(service.get_booking(&owner, created.booking.id).await);
        assert_eq!(held.booking_status, BookingStatus::Cancelled);
        assert!(!held.seats_released);

        events.fail_releases(false);
        let cancellation = assert_ok!(service.cancel_booking(&owner, created.booking.id).await);
        assert_eq!(cancellation.refund_amount, 90_000);
        assert!(cancellation.booking.seats_released);
        let Ok(Some(event)) = events.get_event(event.id).await else {
            panic!("event missing");
        };
        assert_eq!(event.seats.booked(), 0);

        let err = assert_err!(service.cancel_booking(&owner, created.booking.id).await);
        assert!(matches!(err, ApiError::InvalidState(_)));
    }
}
