//! Booking DTOs for creation, status changes, cancellation and listings.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{EventSummaryDto, PaginationMeta, PaginationParams};
use crate::domain::{
    Attendee, Booking, BookingRequest, BookingStatus, Event, EventId, PaymentStatus,
};
use crate::persistence::BookingFilter;
use crate::service::{Cancellation, StatusUpdate};

/// Request body for `POST /bookings`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Event to book.
    pub event_id: EventId,
    /// Number of tickets (1-10).
    pub tickets_booked: u32,
    /// One attendee per ticket; placeholders are generated when omitted.
    #[serde(default)]
    pub attendee_details: Option<Vec<Attendee>>,
    /// Free-form requests (max 500 chars).
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl From<CreateBookingRequest> for BookingRequest {
    fn from(req: CreateBookingRequest) -> Self {
        Self {
            event_id: req.event_id,
            tickets_booked: req.tickets_booked,
            attendee_details: req.attendee_details.unwrap_or_default(),
            special_requests: req
                .special_requests
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
        }
    }
}

/// Request body for `PUT /bookings/{id}/status`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusRequest {
    /// New booking status.
    #[serde(alias = "bookingStatus")]
    pub status: Option<BookingStatus>,
    /// New payment status.
    pub payment_status: Option<PaymentStatus>,
}

impl From<UpdateBookingStatusRequest> for StatusUpdate {
    fn from(req: UpdateBookingStatusRequest) -> Self {
        Self {
            booking_status: req.status,
            payment_status: req.payment_status,
        }
    }
}

/// Query parameters for booking listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookingQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page (max 100).
    #[serde(alias = "limit")]
    pub per_page: Option<u32>,
    /// Booking status.
    #[param(value_type = Option<String>)]
    pub status: Option<BookingStatus>,
    /// Payment status.
    #[param(value_type = Option<String>)]
    pub payment_status: Option<PaymentStatus>,
    /// Booked event (admin listing only).
    pub event_id: Option<uuid::Uuid>,
}

impl BookingQuery {
    /// Pagination part of the query.
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }

    /// Storage filter for the admin listing.
    #[must_use]
    pub fn filter(&self) -> BookingFilter {
        BookingFilter {
            user_id: None,
            event_id: self.event_id.map(EventId::from_uuid),
            booking_status: self.status,
            payment_status: self.payment_status,
        }
    }
}

/// Booking with its derived fields.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    /// The booking.
    #[serde(flatten)]
    pub booking: Booking,
    /// Short display code.
    pub booking_code: String,
    /// Confirmed and paid.
    pub is_active: bool,
    /// Booked event, when loaded alongside.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummaryDto>,
}

impl BookingResponse {
    /// Attaches an event summary.
    #[must_use]
    pub fn with_event(mut self, event: &Event) -> Self {
        self.event = Some(EventSummaryDto::from(event));
        self
    }
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_code: booking.booking_code(),
            is_active: booking.is_active(),
            booking,
            event: None,
        }
    }
}

/// Response body for booking listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingListResponse {
    /// Bookings on this page, newest first.
    pub data: Vec<BookingResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `DELETE /bookings/{id}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingResponse {
    /// Refund granted, in minor units.
    pub refund_amount: i64,
    /// The cancelled booking.
    pub booking: BookingResponse,
}

impl From<Cancellation> for CancelBookingResponse {
    fn from(cancellation: Cancellation) -> Self {
        Self {
            refund_amount: cancellation.refund_amount,
            booking: cancellation.booking.into(),
        }
    }
}
