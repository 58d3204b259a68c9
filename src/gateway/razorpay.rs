//! Razorpay REST adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{GatewayFailure, GatewayOrder, GatewayPayment, OrderRequest, PaymentGateway};

const MAX_ERROR_BODY: usize = 200;

/// Razorpay orders/payments API client.
#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    base_url: String,
    key_id: String,
    key_secret: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct AcquirerData {
    #[serde(default)]
    rrn: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    acquirer_data: Option<AcquirerData>,
}

impl RazorpayGateway {
    /// Creates an adapter for `base_url` (e.g. `https://api.razorpay.com`).
    #[must_use]
    pub fn new(base_url: String, key_id: String, key_secret: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayFailure> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
                return Err(GatewayFailure::Timeout);
            }
            return Err(GatewayFailure::Rejected {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayFailure::Malformed(e.to_string()))
    }
}

fn transport_failure(err: &reqwest::Error) -> GatewayFailure {
    if err.is_timeout() {
        GatewayFailure::Timeout
    } else {
        GatewayFailure::Transport(err.to_string())
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayFailure> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        let order: OrderResponse = Self::read_json(response).await?;
        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayFailure> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        let payment: PaymentResponse = Self::read_json(response).await?;
        let transaction_id = payment
            .acquirer_data
            .and_then(|data| data.rrn)
            .filter(|rrn| !rrn.is_empty())
            .unwrap_or_else(|| payment.id.clone());
        Ok(GatewayPayment {
            method: payment.method.unwrap_or_default(),
            status: payment.status.unwrap_or_default(),
            id: payment.id,
            transaction_id,
        })
    }
}
