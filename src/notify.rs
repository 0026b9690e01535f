//! Notification sink
//!
//! Events are fire-and-forget: callers log a failed dispatch and move on.

use async_trait::async_trait;

use crate::domain::events::OrderEvent;

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError>;
}

/// Publishes each event as JSON on `orders.<kind>`.
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;
        self.client.publish(format!("orders.{}", event.kind()), payload.into()).await?;
        Ok(())
    }
}

/// Used when no broker is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        tracing::info!(kind = event.kind(), order_id = %event.order_id(), event = %serde_json::to_string(event)?, "Order event");
        Ok(())
    }
}
