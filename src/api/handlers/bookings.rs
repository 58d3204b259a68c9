//! Booking handlers: create, read, list, status update and cancellation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{
    BookingListResponse, BookingQuery, BookingResponse, CancelBookingResponse,
    CreateBookingRequest, UpdateBookingStatusRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::domain::{BookingId, Requester, UserId};
use crate::error::{ApiError, ErrorResponse};

/// `POST /bookings`: Book tickets for an event.
///
/// # Errors
///
/// Returns [`ApiError`] for invalid input, unknown or past events and
/// insufficient seats.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    summary = "Create a booking",
    description = "Holds the requested seats and records a booking awaiting payment. The total is the event price at this moment times the ticket count.",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Invalid request, past event or insufficient seats", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .booking_service
        .create_booking(&requester, req.into())
        .await?;
    let response = BookingResponse::from(created.booking).with_event(&created.event);
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /bookings`: List all bookings (admin).
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-admins.
#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    summary = "List all bookings",
    description = "Returns bookings newest first, filterable by event and status. Admin only.",
    params(BookingQuery),
    responses(
        (status = 200, description = "Paginated booking list", body = BookingListResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    requester: Requester,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = query.pagination();
    let bookings = state
        .booking_service
        .list_all(&requester, &query.filter(), pagination.window())
        .await?;
    Ok(Json(BookingListResponse {
        data: bookings.items.into_iter().map(BookingResponse::from).collect(),
        pagination: pagination.meta(bookings.total),
    }))
}

/// `GET /bookings/user/{user_id}`: List a user's bookings.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless the caller is that user or an admin.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/user/{user_id}",
    tag = "Bookings",
    summary = "List a user's bookings",
    description = "Returns the user's bookings newest first, filterable by `status` and `paymentStatus`.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
        BookingQuery,
    ),
    responses(
        (status = 200, description = "Paginated booking list", body = BookingListResponse),
        (status = 403, description = "Not the user or an admin", body = ErrorResponse),
    )
)]
pub async fn list_user_bookings(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(user_id): ApiPath<uuid::Uuid>,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = query.pagination();
    let bookings = state
        .booking_service
        .list_for_user(
            &requester,
            UserId::from_uuid(user_id),
            query.status,
            query.payment_status,
            pagination.window(),
        )
        .await?;
    Ok(Json(BookingListResponse {
        data: bookings.items.into_iter().map(BookingResponse::from).collect(),
        pagination: pagination.meta(bookings.total),
    }))
}

/// `GET /bookings/{id}`: Get one booking.
///
/// # Errors
///
/// Returns [`ApiError::BookingNotFound`] or [`ApiError::Forbidden`].
#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    summary = "Get a booking",
    description = "Returns one booking. Visible to its owner and to admins.",
    params(("id" = uuid::Uuid, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Booking details", body = BookingResponse),
        (status = 403, description = "Not the owner or an admin", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .booking_service
        .get_booking(&requester, BookingId::from_uuid(id))
        .await?;
    Ok(Json(BookingResponse::from(booking)))
}

/// `PUT /bookings/{id}/status`: Move status fields forward.
///
/// # Errors
///
/// Returns [`ApiError`] for an empty update, a move the booking does not
/// allow, an unknown booking or an ownership violation.
#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/status",
    tag = "Bookings",
    summary = "Update booking status",
    description = "Applies whichever of `status` and `paymentStatus` are present, forward only: `confirmed -> completed` and `pending -> completed -> refunded`, admins only. Cancelled, failed and refunded bookings are closed. Seats are not touched; use DELETE to cancel and `/payment/failure` to fail a payment.",
    params(("id" = uuid::Uuid, Path, description = "Booking UUID")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Updated booking", body = BookingResponse),
        (status = 400, description = "Nothing to update or move not allowed", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<uuid::Uuid>,
    ApiJson(req): ApiJson<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .booking_service
        .update_status(&requester, BookingId::from_uuid(id), req.into())
        .await?;
    Ok(Json(BookingResponse::from(booking)))
}

/// `DELETE /bookings/{id}`: Cancel a booking.
///
/// # Errors
///
/// Returns [`ApiError`] for unknown bookings, ownership violations, and
/// bookings that are already cancelled or whose event has started.
#[utoipa::path(
    delete,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    summary = "Cancel a booking",
    description = "Cancels the booking and releases its seats. Refund: 90% at 7 or more days before the event, 50% at 3 to 6 days, nothing after that.",
    params(("id" = uuid::Uuid, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Booking cancelled", body = CancelBookingResponse),
        (status = 400, description = "Event started or booking already cancelled", body = ErrorResponse),
        (status = 403, description = "Not the owner or an admin", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cancellation = state
        .booking_service
        .cancel_booking(&requester, BookingId::from_uuid(id))
        .await?;
    Ok(Json(CancelBookingResponse::from(cancellation)))
}

/// Booking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/user/{user_id}", get(list_user_bookings))
        .route(
            "/bookings/{id}",
            get(get_booking).delete(cancel_booking),
        )
        .route("/bookings/{id}/status", put(update_booking_status))
}
