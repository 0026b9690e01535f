//! Payment gateway capability
//!
//! The orchestrator only needs two things from a gateway: create a remote
//! payment intent for an amount, and check that a confirmation was signed
//! with the shared secret.

pub mod http;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpPaymentGateway;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote payment intent for `amount_minor` units of `currency`.
    async fn create_intent(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<PaymentIntent, GatewayError>;

    /// Check `signature` against `payload` using the gateway's shared secret.
    fn verify_signature(&self, payload: &str, signature: &str) -> bool;
}
