//! Payment gateway collaborators.
//!
//! [`PaymentGateway`] abstracts the third-party processor. The concrete
//! adapter is chosen once at startup from configuration: [`RazorpayGateway`]
//! talks to the real API, [`StubGateway`] answers locally for development
//! and tests. Nothing switches between them at runtime.

pub mod razorpay;
pub mod stub;

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ApiError;

pub use razorpay::RazorpayGateway;
pub use stub::{StubBehavior, StubGateway};

/// Order creation request sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Amount in the currency's minor unit (paise for INR).
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt reference.
    pub receipt: String,
    /// Audit metadata attached to the order.
    pub notes: BTreeMap<String, String>,
}

/// Order as acknowledged by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    /// Gateway order id.
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Authoritative payment details fetched from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    /// Gateway payment id.
    pub id: String,
    /// Method string as reported by the gateway (`card`, `upi`, ...).
    pub method: String,
    /// Bank reference number, or the payment id when none is reported.
    pub transaction_id: String,
    /// Gateway payment status (`captured`, `authorized`, ...).
    pub status: String,
}

/// Failure talking to the gateway.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayFailure {
    /// No answer within the configured timeout.
    #[error("gateway timed out")]
    Timeout,
    /// Gateway answered with a non-success status.
    #[error("gateway rejected the request with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },
    /// Connection-level failure.
    #[error("gateway transport error: {0}")]
    Transport(String),
    /// Response could not be understood.
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl From<GatewayFailure> for ApiError {
    fn from(failure: GatewayFailure) -> Self {
        Self::PaymentGateway(failure.to_string())
    }
}

/// Third-party payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync + Debug {
    /// Short adapter name for logs.
    fn name(&self) -> &'static str;

    /// Public key id handed to checkout clients.
    fn key_id(&self) -> &str;

    /// Creates a payment order.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayFailure`] if the gateway cannot create the order.
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayFailure>;

    /// Fetches a payment by id.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayFailure`] if the payment cannot be fetched.
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayFailure>;
}
