//! In-process store for development and tests
//!
//! A transaction holds the store's lock for its whole lifetime and works on a
//! private copy of the tables, so transactions are fully serialised and an
//! uncommitted copy simply disappears on drop.
//!
//! Reads open a transaction too, so while a checkout is waiting on the payment
//! gateway every other call queues behind it, for up to the order deadline.
//! Not suitable for production traffic; use [`super::PgStore`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::domain::aggregates::{Account, Order, Product};
use crate::{EcommerceError, Result};

#[derive(Clone, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn account(&mut self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.work.accounts.get(&id).cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<()> {
        if self.work.accounts.values().any(|a| a.email == account.email) {
            return Err(EcommerceError::validation("email", "is already registered"));
        }
        self.work.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn append_account_order(&mut self, account_id: Uuid, order_id: Uuid) -> Result<()> {
        let account = self
            .work
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| EcommerceError::NotFound(format!("Account {account_id}")))?;
        account.append_order(order_id);
        Ok(())
    }

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn product_for_update(&mut self, id: Uuid) -> Result<Option<Product>> {
        self.product(id).await
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        self.work.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        match self.work.products.get_mut(&product.id) {
            Some(slot) => { *slot = product.clone(); Ok(()) }
            None => Err(EcommerceError::NotFound(format!("Product {}", product.id))),
        }
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn order_for_update(&mut self, id: Uuid) -> Result<Option<Order>> {
        self.order(id).await
    }

    async fn order_by_intent_for_update(&mut self, intent_id: &str) -> Result<Option<Order>> {
        Ok(self.work.orders.values().find(|o| o.payment_intent_id == intent_id).cloned())
    }

    async fn orders_for_account(&mut self, account_id: Uuid) -> Result<Vec<Order>> {
        let Some(account) = self.work.accounts.get(&account_id) else { return Ok(vec![]) };
        Ok(account.orders.iter().filter_map(|id| self.work.orders.get(id).cloned()).collect())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.work.orders.values().any(|o| o.order_number == order.order_number) {
            return Err(EcommerceError::Storage(format!("duplicate order number {}", order.order_number)));
        }
        self.work.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn save_order(&mut self, order: &Order) -> Result<()> {
        match self.work.orders.get_mut(&order.id) {
            Some(slot) => { *slot = order.clone(); Ok(()) }
            None => Err(EcommerceError::NotFound(format!("Order {}", order.id))),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
