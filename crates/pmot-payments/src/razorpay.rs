use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::signature::verify_payment_signature;
use crate::{GatewayError, Order, PaymentGateway};

pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Razorpay orders API client.
pub struct RazorpayGateway {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self::with_api_base(DEFAULT_API_BASE.to_string(), key_id, key_secret)
    }

    pub fn with_api_base(api_base: String, key_id: String, key_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, amount: i64, currency: &str) -> Result<Order, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "payment_capture": 1,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Razorpay order creation failed: {} {}", status, body);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        let order = Order::from_response(raw)?;

        info!("Razorpay order {} created for {} {}", order.id, amount, currency);
        Ok(order)
    }

    fn verify_signature(&self, payment_id: &str, order_id: &str, signature: &str) -> bool {
        verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_payment;

    #[test]
    fn verifies_with_key_secret() {
        let gateway = RazorpayGateway::new("rzp_test_key".into(), "secret".into());
        let sig = sign_payment("secret", "order_1", "pay_1");
        assert!(gateway.verify_signature("pay_1", "order_1", &sig));
        assert!(!gateway.verify_signature("pay_1", "order_1", "deadbeef"));
    }

    #[test]
    fn api_base_trailing_slash_is_dropped() {
        let gateway =
            RazorpayGateway::with_api_base("http://localhost:9/".into(), "k".into(), "s".into());
        assert_eq!(gateway.api_base, "http://localhost:9");
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_request_error() {
        let gateway =
            RazorpayGateway::with_api_base("http://127.0.0.1:1".into(), "k".into(), "s".into());
        let err = gateway.create_order(49900, "INR").await.unwrap_err();
        assert!(matches!(err, GatewayError::Request(_)));
    }
}
