//! Payment handlers: order creation, verification, failure and history.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BookingQuery, BookingRef, BookingResponse, CreateOrderResponse, PaymentConfirmation,
    PaymentHistoryResponse, VerifyPaymentRequest,
};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::app_state::AppState;
use crate::domain::Requester;
use crate::error::{ApiError, ErrorResponse};

/// `POST /payment/create-order`: Open a gateway order for a booking.
///
/// # Errors
///
/// Returns [`ApiError`] for unknown, foreign, paid or cancelled bookings
/// and gateway failures.
#[utoipa::path(
    post,
    path = "/api/v1/payment/create-order",
    tag = "Payments",
    summary = "Create a payment order",
    description = "Creates a gateway order for the booking total and records the order id on the booking. A gateway failure leaves the booking unchanged.",
    request_body = BookingRef,
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Booking already paid or not payable", body = ErrorResponse),
        (status = 403, description = "Not the owner or an admin", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(req): ApiJson<BookingRef>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .payment_service
        .create_order(&requester, req.booking_id)
        .await?;
    Ok(Json(CreateOrderResponse::from(order)))
}

/// `POST /payment/verify`: Confirm a payment.
///
/// # Errors
///
/// Returns [`ApiError::InvalidSignature`] on a signature mismatch and other
/// [`ApiError`]s for invalid booking state or gateway failures.
#[utoipa::path(
    post,
    path = "/api/v1/payment/verify",
    tag = "Payments",
    summary = "Verify a payment",
    description = "Checks the gateway signature over `orderId|paymentId`, fetches the payment from the gateway and confirms the booking with a ticket token. Failures after the signature check release the seats.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = PaymentConfirmation),
        (status = 400, description = "Invalid signature or booking state", body = ErrorResponse),
        (status = 403, description = "Not the owner or an admin", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = ErrorResponse),
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(req): ApiJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .payment_service
        .verify_payment(&requester, req.into())
        .await?;
    Ok(Json(PaymentConfirmation::from(booking)))
}

/// `POST /payment/failure`: Record a failed or abandoned payment.
///
/// # Errors
///
/// Returns [`ApiError`] for unknown, foreign or already paid bookings.
#[utoipa::path(
    post,
    path = "/api/v1/payment/failure",
    tag = "Payments",
    summary = "Report a payment failure",
    description = "Marks the payment failed, cancels the booking and releases its seats. Repeated calls release nothing further.",
    request_body = BookingRef,
    responses(
        (status = 200, description = "Failure recorded", body = BookingResponse),
        (status = 400, description = "Booking already paid", body = ErrorResponse),
        (status = 403, description = "Not the owner or an admin", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn payment_failure(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(req): ApiJson<BookingRef>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .payment_service
        .handle_failure(&requester, req.booking_id)
        .await?;
    Ok(Json(BookingResponse::from(booking)))
}

/// `GET /payment/history`: Paid bookings and revenue (admin).
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-admins.
#[utoipa::path(
    get,
    path = "/api/v1/payment/history",
    tag = "Payments",
    summary = "Payment history",
    description = "Lists bookings with a completed payment, newest first, with the total revenue. Admin only.",
    params(BookingQuery),
    responses(
        (status = 200, description = "Payment history", body = PaymentHistoryResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn payment_history(
    State(state): State<AppState>,
    requester: Requester,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = query.pagination();
    let history = state
        .payment_service
        .history(&requester, pagination.window())
        .await?;
    Ok(Json(PaymentHistoryResponse {
        data: history
            .bookings
            .items
            .into_iter()
            .map(BookingResponse::from)
            .collect(),
        total_revenue: history.total_revenue,
        pagination: pagination.meta(history.bookings.total),
    }))
}

/// Payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment/create-order", post(create_order))
        .route("/payment/verify", post(verify_payment))
        .route("/payment/failure", post(payment_failure))
        .route("/payment/history", get(payment_history))
}
