//! Payment reconciliation: gateway orders, signature verification,
//! failure handling and ticket issuance.
//!
//! Once a payment signature has been accepted, any later failure marks the
//! booking failed and releases its seats before the error is returned.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::release_held_seats;
use crate::domain::signature::verify_payment_signature;
use crate::domain::ticket::{self, TicketClaims};
use crate::domain::{
    Booking, BookingId, BookingStatus, PaymentMethod, PaymentStatus, Requester,
};
use crate::error::ApiError;
use crate::gateway::{GatewayFailure, OrderRequest, PaymentGateway};
use crate::persistence::{BookingFilter, BookingStore, EventStore, Page, Paged};

/// Secrets and limits used by [`PaymentService`].
#[derive(Clone)]
pub struct PaymentSettings {
    /// Gateway key secret; signs `order_id|payment_id`.
    pub gateway_secret: String,
    /// Server secret for ticket tokens.
    pub ticket_secret: String,
    /// ISO currency code for new orders.
    pub currency: String,
    /// Upper bound on every gateway call.
    pub gateway_timeout: Duration,
}

impl std::fmt::Debug for PaymentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSettings")
            .field("gateway_secret", &"<redacted>")
            .field("ticket_secret", &"<redacted>")
            .field("currency", &self.currency)
            .field("gateway_timeout", &self.gateway_timeout)
            .finish()
    }
}

/// Checkout details returned after order creation.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    /// Gateway order id.
    pub order_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Booking being paid for.
    pub booking_id: BookingId,
    /// Title of the booked event.
    pub event_title: String,
    /// Public gateway key for the checkout widget.
    pub key_id: String,
}

/// Client-reported payment confirmation.
#[derive(Debug, Clone)]
pub struct VerifyPayment {
    /// Booking being paid for.
    pub booking_id: BookingId,
    /// Gateway order id.
    pub order_id: String,
    /// Gateway payment id.
    pub payment_id: String,
    /// Hex HMAC supplied by the gateway checkout.
    pub signature: String,
}

/// Completed payments and their sum.
#[derive(Debug, Clone)]
pub struct PaymentHistory {
    /// One page of paid bookings, newest first.
    pub bookings: Paged<Booking>,
    /// Sum of `total_amount` over all paid bookings, in minor units.
    pub total_revenue: i64,
}

/// Reconciles bookings with the payment gateway.
#[derive(Debug, Clone)]
pub struct PaymentService {
    events: Arc<dyn EventStore>,
    bookings: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: PaymentSettings,
}

impl PaymentService {
    /// Creates a new `PaymentService`.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            events,
            bookings,
            gateway,
            settings,
        }
    }

    /// Name of the configured payment gateway.
    #[must_use]
    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Creates a gateway order for a pending booking and records its id.
    ///
    /// A gateway failure leaves the booking untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`], [`ApiError::Forbidden`],
    /// [`ApiError::AlreadyPaid`], [`ApiError::InvalidState`] for cancelled
    /// or free bookings, or [`ApiError::PaymentGateway`].
    pub async fn create_order(
        &self,
        requester: &Requester,
        booking_id: BookingId,
    ) -> Result<OrderDetails, ApiError> {
        let booking = self.load(booking_id).await?;
        requester.ensure_access(booking.user_id)?;
        ensure_payable(&booking)?;
        if booking.total_amount <= 0 {
            return Err(ApiError::InvalidState(
                "booking has nothing to pay".to_string(),
            ));
        }
        let event = self
            .events
            .get_event(booking.event_id)
            .await?
            .ok_or(ApiError::EventNotFound)?;

        let mut notes = BTreeMap::new();
        notes.insert("bookingId".to_string(), booking.id.to_string());
        notes.insert("userId".to_string(), booking.user_id.to_string());
        notes.insert("eventId".to_string(), booking.event_id.to_string());
        notes.insert("eventTitle".to_string(), event.title.clone());
        let request = OrderRequest {
            amount: booking.total_amount,
            currency: self.settings.currency.clone(),
            receipt: format!("booking_{}", booking.id),
            notes,
        };

        let order = self
            .bounded(self.gateway.create_order(request))
            .await
            .inspect_err(|err| {
                tracing::warn!(%booking_id, gateway = self.gateway.name(), error = %err, "order creation failed");
            })?;

        let order_id = order.id.clone();
        self.bookings
            .update_booking(
                booking_id,
                Box::new(move |booking: &mut Booking| {
                    ensure_payable(booking)?;
                    booking.payment_details.order_id = Some(order_id);
                    booking.updated_at = Utc::now();
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(%booking_id, order_id = %order.id, amount = order.amount, "payment order created");
        Ok(OrderDetails {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            booking_id,
            event_title: event.title,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Verifies a payment confirmation and, on success, marks the booking
    /// paid and issues its ticket token.
    ///
    /// A rejected signature never mutates the booking. Failures after the
    /// signature is accepted mark the booking failed and release its seats.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`], [`ApiError::Forbidden`],
    /// [`ApiError::AlreadyPaid`], [`ApiError::InvalidState`],
    /// [`ApiError::InvalidSignature`] or [`ApiError::PaymentGateway`].
    pub async fn verify_payment(
        &self,
        requester: &Requester,
        input: VerifyPayment,
    ) -> Result<Booking, ApiError> {
        let booking_id = input.booking_id;
        let booking = self.load(booking_id).await?;
        requester.ensure_access(booking.user_id)?;
        ensure_payable(&booking)?;

        let Some(recorded_order) = booking.payment_details.order_id.as_deref() else {
            return Err(ApiError::InvalidState(
                "no payment order has been created for this booking".to_string(),
            ));
        };
        if recorded_order != input.order_id {
            tracing::warn!(%booking_id, "payment order id does not match the recorded order");
            return Err(ApiError::InvalidSignature);
        }
        if let Err(err) = verify_payment_signature(
            &self.settings.gateway_secret,
            &input.order_id,
            &input.payment_id,
            &input.signature,
        ) {
            tracing::warn!(%booking_id, "payment signature rejected");
            return Err(err);
        }

        let payment = match self.bounded(self.gateway.fetch_payment(&input.payment_id)).await {
            Ok(payment) if payment.status == "failed" => {
                return Err(self
                    .abandon_after_verification(
                        &booking,
                        ApiError::PaymentGateway("gateway reports the payment as failed".to_string()),
                    )
                    .await);
            }
            Ok(payment) => payment,
            Err(err) => return Err(self.abandon_after_verification(&booking, err).await),
        };

        let secret = self.settings.ticket_secret.clone();
        let VerifyPayment {
            payment_id,
            signature,
            ..
        } = input;
        let confirmed = self
            .bookings
            .update_booking(
                booking_id,
                Box::new(move |booking: &mut Booking| {
                    ensure_payable(booking)?;
                    booking.payment_details.payment_id = Some(payment_id);
                    booking.payment_details.signature = Some(signature);
                    booking.payment_details.method =
                        Some(PaymentMethod::from_gateway(&payment.method));
                    booking.payment_details.transaction_id = Some(payment.transaction_id);
                    booking.payment_status = PaymentStatus::Completed;
                    booking.booking_status = BookingStatus::Confirmed;
                    booking.qr_code = Some(ticket::issue(&secret, booking)?);
                    booking.updated_at = Utc::now();
                    Ok(())
                }),
            )
            .await;

        match confirmed {
            Ok(booking) => {
                tracing::info!(%booking_id, code = %booking.booking_code(), "payment verified");
                Ok(booking)
            }
            Err(err @ (ApiError::AlreadyPaid | ApiError::InvalidState(_))) => Err(err),
            Err(err) => Err(self.abandon_after_verification(&booking, err).await),
        }
    }

    /// Client-reported payment failure: cancels the booking and releases
    /// its seats. Calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`], [`ApiError::Forbidden`] or
    /// [`ApiError::AlreadyPaid`].
    pub async fn handle_failure(
        &self,
        requester: &Requester,
        booking_id: BookingId,
    ) -> Result<Booking, ApiError> {
        let booking = self.load(booking_id).await?;
        requester.ensure_access(booking.user_id)?;
        if matches!(
            booking.payment_status,
            PaymentStatus::Completed | PaymentStatus::Refunded
        ) {
            return Err(ApiError::AlreadyPaid);
        }
        let booking = self.mark_failed(&booking).await?;
        tracing::info!(%booking_id, "payment failure recorded");
        Ok(booking)
    }

    /// Lists one page of paid bookings with the revenue over all of them
    /// (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins.
    pub async fn history(
        &self,
        requester: &Requester,
        page: Page,
    ) -> Result<PaymentHistory, ApiError> {
        requester.ensure_admin()?;
        let filter = BookingFilter {
            payment_status: Some(PaymentStatus::Completed),
            ..BookingFilter::default()
        };
        let bookings = self.bookings.list_bookings(&filter, page).await?;
        let total_revenue = self.bookings.revenue(&filter).await?;
        Ok(PaymentHistory {
            bookings,
            total_revenue,
        })
    }

    /// Checks a ticket token at the door (admin only). No storage access.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins and
    /// [`ApiError::InvalidTicket`] for forged or malformed tokens.
    pub fn verify_ticket(
        &self,
        requester: &Requester,
        token: &str,
    ) -> Result<TicketClaims, ApiError> {
        requester.ensure_admin()?;
        ticket::verify(&self.settings.ticket_secret, token)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayFailure>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.settings.gateway_timeout, call).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(GatewayFailure::Timeout.into()),
        }
    }

    /// Compensates a failure that happened after the signature was
    /// accepted. Returns the error to surface.
    async fn abandon_after_verification(&self, booking: &Booking, cause: ApiError) -> ApiError {
        tracing::warn!(booking_id = %booking.id, error = %cause, "payment verification failed, releasing seats");
        match self.mark_failed(booking).await {
            Ok(_) | Err(ApiError::AlreadyPaid) => {}
            Err(err) => {
                tracing::error!(booking_id = %booking.id, error = %err, "compensation after payment failure did not complete");
            }
        }
        cause
    }

    async fn mark_failed(&self, booking: &Booking) -> Result<Booking, ApiError> {
        let mut failed = self
            .bookings
            .update_booking(
                booking.id,
                Box::new(|booking: &mut Booking| {
                    if matches!(
                        booking.payment_status,
                        PaymentStatus::Completed | PaymentStatus::Refunded
                    ) {
                        return Err(ApiError::AlreadyPaid);
                    }
                    booking.payment_status = PaymentStatus::Failed;
                    booking.booking_status = BookingStatus::Cancelled;
                    booking.updated_at = Utc::now();
                    Ok(())
                }),
            )
            .await?;
        release_held_seats(self.events.as_ref(), self.bookings.as_ref(), &failed).await?;
        failed.seats_released = true;
        Ok(failed)
    }

    async fn load(&self, id: BookingId) -> Result<Booking, ApiError> {
        self.bookings
            .get_booking(id)
            .await?
            .ok_or(ApiError::BookingNotFound)
    }
}

fn ensure_payable(booking: &Booking) -> Result<(), ApiError> {
    if matches!(
        booking.payment_status,
        PaymentStatus::Completed | PaymentStatus::Refunded
    ) {
        return Err(ApiError::AlreadyPaid);
    }
    if booking.booking_status == BookingStatus::Cancelled
        || booking.payment_status == PaymentStatus::Failed
    {
        return Err(ApiError::InvalidState(
            "booking is no longer awaiting payment".to_string(),
        ));
    }
    Ok(())
}
