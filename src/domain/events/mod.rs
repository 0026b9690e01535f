//! Domain events
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus};

/// Published to the notification sink after the owning transaction commits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, account_id: Uuid, email: String, total_amount: Decimal, currency: String },
    PaymentConfirmed { order_id: Uuid, order_number: String, account_id: Uuid, confirmation_id: String },
    PaymentFailed { order_id: Uuid, order_number: String, account_id: Uuid },
    Cancelled { order_id: Uuid, order_number: String, account_id: Uuid, reason: String },
    StatusChanged { order_id: Uuid, order_number: String, account_id: Uuid, status: OrderStatus },
}

impl OrderEvent {
    /// Subject suffix, e.g. `placed` for `orders.placed`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::PaymentConfirmed { .. } => "payment_confirmed",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::Cancelled { .. } => "cancelled",
            Self::StatusChanged { .. } => "status_changed",
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            Self::Placed { order_id, .. }
            | Self::PaymentConfirmed { order_id, .. }
            | Self::PaymentFailed { order_id, .. }
            | Self::Cancelled { order_id, .. }
            | Self::StatusChanged { order_id, .. } => *order_id,
        }
    }

    pub fn payment_confirmed(order: &Order, confirmation_id: &str) -> Self {
        Self::PaymentConfirmed {
            order_id: order.id(), order_number: order.order_number().to_string(),
            account_id: order.account_id(), confirmation_id: confirmation_id.to_string(),
        }
    }

    pub fn payment_failed(order: &Order) -> Self {
        Self::PaymentFailed { order_id: order.id(), order_number: order.order_number().to_string(), account_id: order.account_id() }
    }

    pub fn cancelled(order: &Order) -> Self {
        Self::Cancelled {
            order_id: order.id(), order_number: order.order_number().to_string(), account_id: order.account_id(),
            reason: order.cancel_reason().unwrap_or_default().to_string(),
        }
    }

    pub fn status_changed(order: &Order) -> Self {
        Self::StatusChanged {
            order_id: order.id(), order_number: order.order_number().to_string(),
            account_id: order.account_id(), status: order.status(),
        }
    }
}
