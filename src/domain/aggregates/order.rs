//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{DeliveryAddress, OrderNumber};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub(crate) id: Uuid,
    pub(crate) order_number: OrderNumber,
    pub(crate) account_id: Uuid,
    pub(crate) line_items: Vec<LineItem>,
    pub(crate) total_amount: Decimal,
    pub(crate) currency: String,
    pub(crate) delivery_address: DeliveryAddress,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) status: OrderStatus,
    pub(crate) status_history: Vec<StatusChange>,
    pub(crate) payment_intent_id: String,
    pub(crate) payment_confirmation_id: Option<String>,
    pub(crate) cancel_reason: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Snapshot of a product at the time the order was placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl LineItem {
    pub fn snapshot(product_id: Uuid, name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Result<Self> {
        let line_total = unit_price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| EcommerceError::validation("lineTotal", "is out of range"))?;
        Ok(Self { product_id, name: name.into(), unit_price, quantity, line_total })
    }
}

/// Sum of line totals, failing instead of overflowing.
pub fn order_total(line_items: &[LineItem]) -> Result<Decimal> {
    line_items.iter().try_fold(Decimal::ZERO, |total, item| {
        total.checked_add(item.line_total).ok_or_else(|| EcommerceError::validation("totalAmount", "is out of range"))
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod { #[default] Card, Paypal, CashOnDelivery }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Processing => "processing", Self::Shipped => "shipped",
            Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }
    pub fn is_cancellable(&self) -> bool { matches!(self, Self::Pending | Self::Processing) }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed" }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Card => "card", Self::Paypal => "paypal", Self::CashOnDelivery => "cash-on-delivery" }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending), "processing" => Ok(Self::Processing), "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered), "cancelled" => Ok(Self::Cancelled),
            other => Err(EcommerceError::validation("status", format!("unknown order status '{other}'"))),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending), "paid" => Ok(Self::Paid), "failed" => Ok(Self::Failed),
            other => Err(EcommerceError::validation("paymentStatus", format!("unknown payment status '{other}'"))),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "card" => Ok(Self::Card), "paypal" => Ok(Self::Paypal), "cash-on-delivery" => Ok(Self::CashOnDelivery),
            other => Err(EcommerceError::validation("paymentMethod", format!("unknown payment method '{other}'"))),
        }
    }
}

/// Outcome of applying a verified payment confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment recorded now.
    Confirmed,
    /// Order was already paid; nothing changed.
    AlreadyPaid,
}

impl Order {
    pub fn place(
        account_id: Uuid,
        order_number: OrderNumber,
        line_items: Vec<LineItem>,
        delivery_address: DeliveryAddress,
        payment_method: PaymentMethod,
        currency: &str,
        payment_intent_id: impl Into<String>,
    ) -> Result<Self> {
        if line_items.is_empty() { return Err(EcommerceError::validation("lineItems", "must not be empty")); }
        let now = Utc::now();
        let total_amount = order_total(&line_items)?;
        Ok(Self {
            id: Uuid::now_v7(), order_number, account_id, line_items, total_amount,
            currency: currency.to_string(), delivery_address, payment_method,
            payment_status: PaymentStatus::Pending, status: OrderStatus::Pending,
            status_history: vec![StatusChange { status: OrderStatus::Pending, at: now, note: None }],
            payment_intent_id: payment_intent_id.into(), payment_confirmation_id: None, cancel_reason: None,
            created_at: now, updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn account_id(&self) -> Uuid { self.account_id }
    pub fn line_items(&self) -> &[LineItem] { &self.line_items }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn status_history(&self) -> &[StatusChange] { &self.status_history }
    pub fn payment_intent_id(&self) -> &str { &self.payment_intent_id }
    pub fn payment_confirmation_id(&self) -> Option<&str> { self.payment_confirmation_id.as_deref() }
    pub fn cancel_reason(&self) -> Option<&str> { self.cancel_reason.as_deref() }

    /// Record a verified payment. Replays of an already paid order are no-ops.
    pub fn confirm_payment(&mut self, confirmation_id: &str) -> PaymentOutcome {
        if self.payment_status == PaymentStatus::Paid { return PaymentOutcome::AlreadyPaid; }
        self.payment_status = PaymentStatus::Paid;
        self.payment_confirmation_id = Some(confirmation_id.to_string());
        // Only a pending order advances. Cancelled, shipped or delivered orders keep
        // their status and history; the payment is recorded as-is.
        if self.status == OrderStatus::Pending {
            self.record(OrderStatus::Processing, Some("payment verified".into()));
        } else {
            self.touch();
        }
        PaymentOutcome::Confirmed
    }

    /// Returns false when the order is already paid and must not be downgraded.
    pub fn fail_payment(&mut self) -> bool {
        if self.payment_status == PaymentStatus::Paid { return false; }
        self.payment_status = PaymentStatus::Failed;
        self.touch();
        true
    }

    pub fn cancel(&mut self, reason: &str) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() { return Err(EcommerceError::validation("cancelReason", "is required")); }
        if !self.status.is_cancellable() {
            return Err(EcommerceError::InvalidTransition { from: self.status, to: OrderStatus::Cancelled });
        }
        self.cancel_reason = Some(reason.to_string());
        self.record(OrderStatus::Cancelled, Some(reason.to_string()));
        Ok(())
    }

    /// Admin transition. States may be skipped; only leaving `cancelled` is refused.
    pub fn set_status(&mut self, status: OrderStatus, cancel_reason: Option<&str>) -> Result<()> {
        if self.status == OrderStatus::Cancelled && status != OrderStatus::Cancelled {
            return Err(EcommerceError::InvalidTransition { from: self.status, to: status });
        }
        if status == self.status { return Ok(()); }
        let note = if status == OrderStatus::Cancelled {
            let reason = cancel_reason.map(str::trim).filter(|r| !r.is_empty()).unwrap_or("No reason provided");
            self.cancel_reason = Some(reason.to_string());
            Some(reason.to_string())
        } else {
            None
        };
        self.record(status, note);
        Ok(())
    }

    pub fn event_placed(&self, email: &str) -> OrderEvent {
        OrderEvent::Placed {
            order_id: self.id, order_number: self.order_number.to_string(), account_id: self.account_id,
            email: email.to_string(), total_amount: self.total_amount, currency: self.currency.clone(),
        }
    }

    fn record(&mut self, status: OrderStatus, note: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.status_history.push(StatusChange { status, at: now, note });
        self.updated_at = now;
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
