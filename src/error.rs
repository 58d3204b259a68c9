//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and a structured JSON error response.
//! Storage and unclassified failures are logged server-side and rendered
//! with a generic message so that internal details never reach clients.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "kind": "insufficient_seats",
///     "message": "only 2 seats available"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code, machine-readable kind and message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see ranges on [`ApiError`]).
    pub code: u32,
    /// Stable snake_case error kind.
    pub kind: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status               |
/// |-----------|----------------------|---------------------------|
/// | 1000–1999 | Validation / auth    | 400 / 401 / 403           |
/// | 2000–2999 | Not found / state    | 404 / 400                 |
/// | 3000–3999 | Server / upstream    | 500 / 502 / 504           |
/// | 4000–4999 | Booking / payment    | 400                       |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No caller identity could be established.
    #[error("authentication required")]
    Unauthorized,

    /// Caller is neither the owner of the resource nor an admin.
    #[error("access denied")]
    Forbidden,

    /// Event is missing or has been deactivated.
    #[error("event not found or is not active")]
    EventNotFound,

    /// Booking does not exist.
    #[error("booking not found")]
    BookingNotFound,

    /// Event has already started or is in the past.
    #[error("event has already started")]
    EventExpired,

    /// Payment for the booking was already completed.
    #[error("payment already completed for this booking")]
    AlreadyPaid,

    /// Booking is not in a state that allows the operation.
    #[error("invalid booking state: {0}")]
    InvalidState(String),

    /// Not enough seats left to satisfy the reservation.
    #[error("only {available} seats available, {requested} requested")]
    InsufficientSeats {
        /// Number of seats the caller asked for.
        requested: u32,
        /// Seats available at the time of the attempt.
        available: u32,
    },

    /// Gateway payment signature did not match.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// Ticket verification token is malformed or forged.
    #[error("invalid ticket: {0}")]
    InvalidTicket(String),

    /// Upstream payment provider failure.
    #[error("payment gateway error: {0}")]
    PaymentGateway(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized => 1002,
            Self::Forbidden => 1003,
            Self::EventNotFound => 2001,
            Self::BookingNotFound => 2002,
            Self::EventExpired => 2101,
            Self::AlreadyPaid => 2102,
            Self::InvalidState(_) => 2103,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::PaymentGateway(_) => 3002,
            Self::InsufficientSeats { .. } => 4001,
            Self::InvalidSignature => 4002,
            Self::InvalidTicket(_) => 4003,
        }
    }

    /// Returns the stable machine-readable kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::EventNotFound | Self::BookingNotFound => "not_found",
            Self::EventExpired | Self::AlreadyPaid | Self::InvalidState(_) => "invalid_state",
            Self::InsufficientSeats { .. } => "insufficient_seats",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidTicket(_) => "invalid_ticket",
            Self::PaymentGateway(_) => "gateway_error",
            Self::Persistence(_) | Self::Internal(_) => "internal",
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::EventExpired
            | Self::AlreadyPaid
            | Self::InvalidState(_)
            | Self::InsufficientSeats { .. }
            | Self::InvalidSignature
            | Self::InvalidTicket(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::EventNotFound | Self::BookingNotFound => StatusCode::NOT_FOUND,
            Self::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for failures whose detail must not leave the server.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Internal(_))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_internal() {
            tracing::error!(error = %self, "request failed with internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind(),
                message,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_seats_is_bad_request() {
        let err = ApiError::InsufficientSeats {
            requested: 2,
            available: 1,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "insufficient_seats");
    }

    #[test]
    fn not_found_and_forbidden_statuses() {
        assert_eq!(ApiError::EventNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BookingNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::Persistence("connection refused at 10.0.0.3".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
