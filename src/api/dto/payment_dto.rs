//! Payment and ticket DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking_dto::BookingResponse;
use super::common_dto::PaginationMeta;
use crate::domain::ticket::TicketClaims;
use crate::domain::{Booking, BookingId, BookingStatus, PaymentStatus};
use crate::service::{OrderDetails, VerifyPayment};

/// Request body for `POST /payment/create-order` and `POST /payment/failure`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingRef {
    /// Booking to act on.
    pub booking_id: BookingId,
}

/// Response body for `POST /payment/create-order`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
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

impl From<OrderDetails> for CreateOrderResponse {
    fn from(order: OrderDetails) -> Self {
        Self {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            booking_id: order.booking_id,
            event_title: order.event_title,
            key_id: order.key_id,
        }
    }
}

/// Request body for `POST /payment/verify`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Gateway order id.
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    /// Gateway payment id.
    #[serde(alias = "razorpay_payment_id")]
    pub gateway_payment_id: String,
    /// Hex HMAC-SHA256 of `orderId|paymentId`.
    #[serde(alias = "razorpay_signature")]
    pub gateway_signature: String,
    /// Booking being paid for.
    pub booking_id: BookingId,
}

impl From<VerifyPaymentRequest> for VerifyPayment {
    fn from(req: VerifyPaymentRequest) -> Self {
        Self {
            booking_id: req.booking_id,
            order_id: req.gateway_order_id,
            payment_id: req.gateway_payment_id,
            signature: req.gateway_signature,
        }
    }
}

/// Response body for `POST /payment/verify`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Booking id.
    pub booking_id: BookingId,
    /// Short display code.
    pub booking_code: String,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Booking state.
    pub booking_status: BookingStatus,
    /// Tickets in the booking.
    pub tickets_booked: u32,
    /// Amount paid, in minor units.
    pub total_amount: i64,
    /// Ticket verification token.
    pub qr_code: Option<String>,
}

impl From<Booking> for PaymentConfirmation {
    fn from(booking: Booking) -> Self {
        Self {
            booking_code: booking.booking_code(),
            booking_id: booking.id,
            payment_status: booking.payment_status,
            booking_status: booking.booking_status,
            tickets_booked: booking.tickets_booked,
            total_amount: booking.total_amount,
            qr_code: booking.qr_code,
        }
    }
}

/// Response body for `GET /payment/history`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistoryResponse {
    /// Paid bookings on this page.
    pub data: Vec<BookingResponse>,
    /// Revenue over all paid bookings, in minor units.
    pub total_revenue: i64,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /tickets/verify`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTicketRequest {
    /// Token read from the ticket QR code.
    pub qr_code: String,
}

/// Response body for `POST /tickets/verify`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTicketResponse {
    /// Always `true`; invalid tokens are rejected with an error.
    pub valid: bool,
    /// Decoded ticket contents.
    pub ticket: TicketClaims,
}
