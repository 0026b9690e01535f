//! Order orchestration
//!
//! [`OrderService`] coordinates the storage transaction, the payment gateway
//! and the notification sink. Each operation runs as one transaction under a
//! deadline. Notifications go out only after commit and never fail the call.

pub mod catalog;
pub mod stock;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{order_total, LineItem, Order, OrderStatus, PaymentMethod, PaymentOutcome};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{first_violation, to_minor_units, DeliveryAddress, OrderNumber};
use crate::notify::Notifier;
use crate::payment::signature::signature_payload;
use crate::payment::{PaymentGateway, PaymentIntent};
use crate::store::Store;
use crate::{EcommerceError, Result};

use stock::StockGuard;

#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub currency: String,
    pub tx_timeout: Duration,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self { currency: "INR".to_string(), tx_timeout: Duration::from_secs(5) }
    }
}

/// The authenticated principal an operation runs on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub account_id: Uuid,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(account_id: Uuid) -> Self { Self { account_id, is_admin: false } }
    pub fn admin(account_id: Uuid) -> Self { Self { account_id, is_admin: true } }

    pub(crate) fn require_admin(&self) -> Result<()> {
        if self.is_admin { Ok(()) } else { Err(EcommerceError::NotAuthorized) }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "must contain at least one item"))]
    pub line_items: Vec<LineRequest>,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub quantity: i64,
}

impl CreateOrderRequest {
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| first_violation("", &e))?;
        for (i, line) in self.line_items.iter().enumerate() {
            line.validate().map_err(|e| first_violation(&format!("lineItems[{i}]"), &e))?;
        }
        self.delivery_address.check()
    }
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment_intent: PaymentIntent,
}

enum Verification {
    Confirmed(Order),
    Unchanged(Order),
    Rejected(Option<OrderEvent>),
}

pub struct OrderService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    settings: OrderSettings,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, notifier: Arc<dyn Notifier>, settings: OrderSettings) -> Self {
        Self { store, gateway, notifier, settings }
    }

    /// Validate the cart, reserve stock, open a payment intent and record the
    /// order, all in one transaction.
    pub async fn create_order(&self, account_id: Uuid, request: CreateOrderRequest) -> Result<PlacedOrder> {
        request.check()?;
        let (placed, email) = self.with_deadline(self.place(account_id, &request)).await?;
        tracing::info!(
            order_id = %placed.order.id(),
            order_number = %placed.order.order_number(),
            total = %placed.order.total_amount(),
            intent_id = %placed.payment_intent.id,
            "Order placed"
        );
        self.dispatch(placed.order.event_placed(&email)).await;
        Ok(placed)
    }

    async fn place(&self, account_id: Uuid, request: &CreateOrderRequest) -> Result<(PlacedOrder, String)> {
        let mut tx = self.store.begin().await?;
        let account = tx
            .account(account_id)
            .await?
            .ok_or_else(|| EcommerceError::NotFound(format!("Account {account_id}")))?;

        let mut guard = StockGuard::lock(tx.as_mut(), request.line_items.iter().map(|l| l.product_id)).await?;
        let mut items = Vec::with_capacity(request.line_items.len());
        for line in &request.line_items {
            let quantity = u32::try_from(line.quantity)
                .map_err(|_| EcommerceError::validation("quantity", "is out of range"))?;
            let product = guard.reserve(line.product_id, quantity)?;
            items.push(LineItem::snapshot(product.id(), product.name(), product.price_after_discount(), quantity)?);
        }
        guard.persist().await?;

        let amount_minor = to_minor_units(order_total(&items)?)?;
        let order_number = OrderNumber::generate(chrono::Utc::now());

        let intent = match self.gateway.create_intent(amount_minor, &self.settings.currency, order_number.as_str()).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(error = %e, account_id = %account_id, amount_minor, "Payment intent creation failed");
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(error = %rb, "Rollback after gateway failure failed");
                }
                return Err(e.into());
            }
        };

        let order = Order::place(
            account.id(),
            order_number,
            items,
            request.delivery_address.clone(),
            request.payment_method,
            &self.settings.currency,
            intent.id.clone(),
        )?;
        tx.insert_order(&order).await?;
        tx.append_account_order(account.id(), order.id()).await?;
        tx.commit().await?;

        Ok((PlacedOrder { order, payment_intent: intent }, account.email().to_string()))
    }

    /// Reconcile a signed payment confirmation with the order holding `intent_id`.
    pub async fn verify_payment(&self, intent_id: &str, confirmation_id: &str, signature: &str) -> Result<Order> {
        for (field, value) in [("intentId", intent_id), ("confirmationId", confirmation_id), ("signature", signature)] {
            if value.trim().is_empty() {
                return Err(EcommerceError::validation(field, "is required"));
            }
        }

        match self.with_deadline(self.reconcile(intent_id, confirmation_id, signature)).await? {
            Verification::Confirmed(order) => {
                tracing::info!(order_id = %order.id(), intent_id, confirmation_id, "Payment verified");
                self.dispatch(OrderEvent::payment_confirmed(&order, confirmation_id)).await;
                Ok(order)
            }
            Verification::Unchanged(order) => {
                tracing::debug!(order_id = %order.id(), intent_id, "Payment already verified; ignoring replay");
                Ok(order)
            }
            Verification::Rejected(event) => {
                if let Some(event) = event {
                    self.dispatch(event).await;
                }
                Err(EcommerceError::PaymentVerificationFailed)
            }
        }
    }

    async fn reconcile(&self, intent_id: &str, confirmation_id: &str, signature: &str) -> Result<Verification> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .order_by_intent_for_update(intent_id)
            .await?
            .ok_or_else(|| EcommerceError::NotFound(format!("Order for payment intent {intent_id}")))?;

        let payload = signature_payload(intent_id, confirmation_id);
        if !self.gateway.verify_signature(&payload, signature) {
            tracing::warn!(order_id = %order.id(), intent_id, "Payment signature mismatch");
            if !order.fail_payment() {
                tx.rollback().await?;
                return Ok(Verification::Rejected(None));
            }
            tx.save_order(&order).await?;
            tx.commit().await?;
            return Ok(Verification::Rejected(Some(OrderEvent::payment_failed(&order))));
        }

        match order.confirm_payment(confirmation_id) {
            PaymentOutcome::AlreadyPaid => {
                tx.rollback().await?;
                Ok(Verification::Unchanged(order))
            }
            PaymentOutcome::Confirmed => {
                tx.save_order(&order).await?;
                tx.commit().await?;
                Ok(Verification::Confirmed(order))
            }
        }
    }

    /// Owner cancellation while the order is still pending or processing.
    /// Reserved stock is not returned and the order stays on record.
    pub async fn cancel_order(&self, caller: &Caller, order_id: Uuid, reason: &str) -> Result<Order> {
        if reason.trim().is_empty() {
            return Err(EcommerceError::validation("cancelReason", "is required"));
        }
        let order = self
            .with_deadline(async {
                let mut tx = self.store.begin().await?;
                let mut order = tx
                    .order_for_update(order_id)
                    .await?
                    .ok_or_else(|| EcommerceError::NotFound(format!("Order {order_id}")))?;
                if order.account_id() != caller.account_id {
                    return Err(EcommerceError::NotAuthorized);
                }
                order.cancel(reason)?;
                tx.save_order(&order).await?;
                tx.commit().await?;
                Ok(order)
            })
            .await?;
        tracing::info!(order_id = %order.id(), reason = order.cancel_reason().unwrap_or_default(), "Order cancelled");
        self.dispatch(OrderEvent::cancelled(&order)).await;
        Ok(order)
    }

    /// Admin status change. Skipping states is allowed; leaving `cancelled` is not.
    pub async fn update_status(&self, caller: &Caller, order_id: Uuid, status: OrderStatus, cancel_reason: Option<&str>) -> Result<Order> {
        caller.require_admin()?;
        let (order, changed) = self
            .with_deadline(async {
                let mut tx = self.store.begin().await?;
                let mut order = tx
                    .order_for_update(order_id)
                    .await?
                    .ok_or_else(|| EcommerceError::NotFound(format!("Order {order_id}")))?;
                let before = order.status();
                order.set_status(status, cancel_reason)?;
                if order.status() == before {
                    tx.rollback().await?;
                    return Ok((order, false));
                }
                tx.save_order(&order).await?;
                tx.commit().await?;
                Ok((order, true))
            })
            .await?;
        if changed {
            tracing::info!(order_id = %order.id(), status = %order.status(), "Order status updated");
            let event = if order.status() == OrderStatus::Cancelled {
                OrderEvent::cancelled(&order)
            } else {
                OrderEvent::status_changed(&order)
            };
            self.dispatch(event).await;
        }
        Ok(order)
    }

    /// Owners and admins may read an order.
    pub async fn order(&self, caller: &Caller, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| EcommerceError::NotFound(format!("Order {order_id}")))?;
        if order.account_id() != caller.account_id && !caller.is_admin {
            return Err(EcommerceError::NotAuthorized);
        }
        Ok(order)
    }

    pub async fn account_orders(&self, caller: &Caller) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        tx.orders_for_account(caller.account_id).await
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.settings.tx_timeout, fut)
            .await
            .map_err(|_| EcommerceError::Timeout)?
    }

    async fn dispatch(&self, event: OrderEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(kind = event.kind(), order_id = %event.order_id(), error = %e, "Order notification failed");
        }
    }
}
