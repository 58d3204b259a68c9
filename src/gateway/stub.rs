//! Local stand-in for the payment gateway.
//!
//! Selected explicitly through configuration for development and tests.
//! The behaviour is fixed at construction so failure paths can be
//! exercised deterministically.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use super::{GatewayFailure, GatewayOrder, GatewayPayment, OrderRequest, PaymentGateway};

/// How the stub answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StubBehavior {
    /// Every call succeeds.
    #[default]
    Succeed,
    /// Order creation is rejected.
    FailOrder,
    /// Payment fetch is rejected.
    FailFetch,
    /// Every call hangs past any sensible timeout.
    Timeout,
}

impl FromStr for StubBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "succeed" | "success" => Ok(Self::Succeed),
            "fail_order" => Ok(Self::FailOrder),
            "fail_fetch" => Ok(Self::FailFetch),
            "timeout" => Ok(Self::Timeout),
            other => Err(format!("unknown stub gateway behavior: {other}")),
        }
    }
}

/// Payment gateway that never leaves the process.
#[derive(Debug, Clone)]
pub struct StubGateway {
    key_id: String,
    behavior: StubBehavior,
}

impl StubGateway {
    /// Creates a stub with the given behaviour.
    #[must_use]
    pub fn new(key_id: impl Into<String>, behavior: StubBehavior) -> Self {
        Self {
            key_id: key_id.into(),
            behavior,
        }
    }

    async fn hang() {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new("rzp_test_stub", StubBehavior::Succeed)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayFailure> {
        match self.behavior {
            StubBehavior::FailOrder => Err(GatewayFailure::Rejected {
                status: 400,
                body: "stub order declined".to_string(),
            }),
            StubBehavior::Timeout => {
                Self::hang().await;
                Err(GatewayFailure::Timeout)
            }
            StubBehavior::Succeed | StubBehavior::FailFetch => Ok(GatewayOrder {
                id: format!("order_stub_{}", uuid::Uuid::new_v4().simple()),
                amount: request.amount,
                currency: request.currency,
            }),
        }
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayFailure> {
        match self.behavior {
            StubBehavior::FailFetch => Err(GatewayFailure::Transport(
                "stub payment lookup failed".to_string(),
            )),
            StubBehavior::Timeout => {
                Self::hang().await;
                Err(GatewayFailure::Timeout)
            }
            StubBehavior::Succeed | StubBehavior::FailOrder => Ok(GatewayPayment {
                id: payment_id.to_string(),
                method: "upi".to_string(),
                transaction_id: payment_id.to_string(),
                status: "captured".to_string(),
            }),
        }
    }
}
