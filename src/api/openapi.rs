//! OpenAPI document for the REST API.

use utoipa::OpenApi;

use super::dto::{
    BookingListResponse, BookingRef, BookingResponse, CancelBookingResponse,
    CreateBookingRequest, CreateEventRequest, CreateOrderResponse, EventListResponse,
    EventResponse, EventSummaryDto, PaginationMeta, PaymentConfirmation, PaymentHistoryResponse,
    UpdateBookingStatusRequest, UpdateEventRequest, VerifyPaymentRequest, VerifyTicketRequest,
    VerifyTicketResponse,
};
use super::handlers::{bookings, events, payments, system, tickets};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI document.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "eventhive-api",
        description = "Event ticketing: seat inventory, bookings, payment reconciliation and refunds."
    ),
    paths(
        system::health_handler,
        events::create_event,
        events::list_events,
        events::get_event,
        events::update_event,
        events::delete_event,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::list_user_bookings,
        bookings::get_booking,
        bookings::update_booking_status,
        bookings::cancel_booking,
        payments::create_order,
        payments::verify_payment,
        payments::payment_failure,
        payments::payment_history,
        tickets::verify_ticket,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        PaginationMeta,
        EventSummaryDto,
        CreateEventRequest,
        UpdateEventRequest,
        EventResponse,
        EventListResponse,
        CreateBookingRequest,
        UpdateBookingStatusRequest,
        BookingResponse,
        BookingListResponse,
        CancelBookingResponse,
        BookingRef,
        CreateOrderResponse,
        VerifyPaymentRequest,
        PaymentConfirmation,
        PaymentHistoryResponse,
        VerifyTicketRequest,
        VerifyTicketResponse,
    )),
    tags(
        (name = "Events", description = "Event catalog"),
        (name = "Bookings", description = "Booking ledger"),
        (name = "Payments", description = "Payment reconciliation"),
        (name = "Tickets", description = "Ticket check-in"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/health",
            "/api/v1/events",
            "/api/v1/events/{id}",
            "/api/v1/bookings",
            "/api/v1/bookings/{id}",
            "/api/v1/bookings/{id}/status",
            "/api/v1/bookings/user/{user_id}",
            "/api/v1/payment/create-order",
            "/api/v1/payment/verify",
            "/api/v1/payment/failure",
            "/api/v1/payment/history",
            "/api/v1/tickets/verify",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
