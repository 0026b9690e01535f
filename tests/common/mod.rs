#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use storefront_orders::domain::events::OrderEvent;
use storefront_orders::notify::{Notifier, NotifyError};
use storefront_orders::payment::{signature, GatewayError, PaymentGateway, PaymentIntent};
use storefront_orders::service::catalog::NewProduct;
use storefront_orders::service::{Caller, CreateOrderRequest, LineRequest};
use storefront_orders::store::{MemoryStore, Store};
use storefront_orders::{DeliveryAddress, OrderService, OrderSettings, PaymentMethod, Product};

pub const SECRET: &str = "test-gateway-secret";

/// Gateway double: hands out sequential intent ids and checks signatures
/// with [`SECRET`].
pub struct ScriptedGateway {
    prefix: String,
    fail: AtomicBool,
    delay_ms: AtomicU64,
    counter: AtomicU64,
    pub requests: Mutex<Vec<(i64, String, String)>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self { Self::with_prefix("test") }
}

impl ScriptedGateway {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            counter: AtomicU64::new(0),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn fail_next(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }
    pub fn delay(&self, delay: Duration) { self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst); }
    pub fn calls(&self) -> usize { self.requests.lock().unwrap().len() }
    pub fn last_amount(&self) -> Option<i64> { self.requests.lock().unwrap().last().map(|r| r.0) }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<PaymentIntent, GatewayError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.requests.lock().unwrap().push((amount_minor, currency.to_string(), receipt.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected { status: 401, message: "bad api key sk_live_123".into() });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent { id: format!("order_{}_{n}", self.prefix), amount_minor, currency: currency.to_string() })
    }

    fn verify_signature(&self, payload: &str, signature: &str) -> bool {
        signature::verify(SECRET, payload, signature)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    fail: AtomicBool,
    pub events: Mutex<Vec<OrderEvent>>,
}

impl RecordingNotifier {
    pub fn fail(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }
    pub fn kinds(&self) -> Vec<&'static str> { self.events.lock().unwrap().iter().map(|e| e.kind()).collect() }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("smtp relay refused connection".into());
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Harness {
    pub service: Arc<OrderService>,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub admin: Caller,
    pub user: Caller,
    pub other: Caller,
}

pub async fn harness() -> Harness {
    harness_with(OrderSettings::default()).await
}

pub async fn harness_with(settings: OrderSettings) -> Harness {
    harness_on(Arc::new(MemoryStore::new()), ScriptedGateway::default(), settings).await
}

/// Harness over any store. Account emails carry a random tag so a shared
/// database can host many harnesses.
pub async fn harness_on(store: Arc<dyn Store>, gateway: ScriptedGateway, settings: OrderSettings) -> Harness {
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = Arc::new(OrderService::new(store, gateway.clone(), notifier.clone(), settings));

    let tag = Uuid::new_v4().simple().to_string();
    let admin = service.register_account("admin", &format!("admin+{tag}@shop.test"), true).await.unwrap();
    let user = service.register_account("alice", &format!("alice+{tag}@shop.test"), false).await.unwrap();
    let other = service.register_account("mallory", &format!("mallory+{tag}@shop.test"), false).await.unwrap();

    Harness {
        service,
        gateway,
        notifier,
        admin: Caller::admin(admin.id()),
        user: Caller::user(user.id()),
        other: Caller::user(other.id()),
    }
}

impl Harness {
    pub async fn product(&self, name: &str, price: i64, discount: i64, stock: u32) -> Product {
        let new = NewProduct { name: name.into(), price: Decimal::from(price), discount_percent: Decimal::from(discount), stock };
        self.service.create_product(&self.admin, new).await.unwrap()
    }

    pub async fn stock(&self, product_id: Uuid) -> u32 {
        self.service.product(product_id).await.unwrap().stock()
    }
}

pub fn address() -> DeliveryAddress {
    DeliveryAddress {
        street: "221B Residency Road".into(),
        line2: None,
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        postal_code: "560025".into(),
        country: "India".into(),
        phone: "9876543210".into(),
    }
}

pub fn request(lines: &[(Uuid, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        line_items: lines.iter().map(|&(product_id, quantity)| LineRequest { product_id, quantity }).collect(),
        delivery_address: address(),
        payment_method: PaymentMethod::Card,
    }
}

pub fn sign(intent_id: &str, confirmation_id: &str) -> String {
    signature::sign(SECRET, &signature::signature_payload(intent_id, confirmation_id)).unwrap()
}
