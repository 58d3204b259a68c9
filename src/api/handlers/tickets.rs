//! Ticket check-in handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{VerifyTicketRequest, VerifyTicketResponse};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::Requester;
use crate::error::{ApiError, ErrorResponse};

/// `POST /tickets/verify`: Check a ticket token at the door (admin).
///
/// # Errors
///
/// Returns [`ApiError::InvalidTicket`] for forged or malformed tokens.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/verify",
    tag = "Tickets",
    summary = "Verify a ticket",
    description = "Decodes a ticket QR token and re-derives its HMAC from the booking, event and user ids. Does not read storage. Admin only.",
    request_body = VerifyTicketRequest,
    responses(
        (status = 200, description = "Ticket is authentic", body = VerifyTicketResponse),
        (status = 400, description = "Invalid ticket", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn verify_ticket(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(req): ApiJson<VerifyTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state
        .payment_service
        .verify_ticket(&requester, &req.qr_code)?;
    Ok(Json(VerifyTicketResponse {
        valid: true,
        ticket,
    }))
}

/// Ticket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/tickets/verify", post(verify_ticket))
}
