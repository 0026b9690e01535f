//! Payment gateway over its REST API (no SDK dependency)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{signature, GatewayError, PaymentGateway, PaymentIntent};

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, key_id: impl Into<String>, key_secret: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({ "amount": amount_minor, "currency": currency, "receipt": receipt }))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        let body: IntentResponse = resp.json().await.map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        tracing::debug!(intent_id = %body.id, amount_minor, currency, "Payment intent created");
        Ok(PaymentIntent { id: body.id, amount_minor, currency: currency.to_string() })
    }

    fn verify_signature(&self, payload: &str, signature: &str) -> bool {
        signature::verify(&self.key_secret, payload, signature)
    }
}
