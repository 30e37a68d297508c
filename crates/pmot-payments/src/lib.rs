//! Payment gateway adapter.
//!
//! The rest of the workspace only sees [`PaymentGateway`]: create a remote
//! order, and check the signature the gateway attached to a completed payment.
//! [`razorpay::RazorpayGateway`] is the production implementation.

pub mod razorpay;
pub mod signature;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

/// An order created on the gateway side.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    /// Full gateway response, handed to the client untouched.
    pub raw: Value,
}

impl Order {
    /// Accept a gateway response only if it carries a string `id`.
    pub fn from_response(raw: Value) -> Result<Self, GatewayError> {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::Malformed("order response has no id".into()))?
            .to_string();
        Ok(Self { id, raw })
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` minor units of `currency`.
    async fn create_order(&self, amount: i64, currency: &str) -> Result<Order, GatewayError>;

    /// Check the signature the gateway issued for `payment_id` on `order_id`.
    fn verify_signature(&self, payment_id: &str, order_id: &str, signature: &str) -> bool;
}
