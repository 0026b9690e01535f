//! Durable storage for products, accounts and orders
//!
//! Every read-modify-write goes through a [`StoreTx`] handle obtained from
//! [`Store::begin`]. The handle is the transaction: nothing it writes is
//! visible to other transactions until [`StoreTx::commit`], and dropping it
//! without committing rolls everything back. `*_for_update` reads take the
//! row lock that serialises concurrent writers of the same record.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Account, Order, Product};
use crate::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn account(&mut self, id: Uuid) -> Result<Option<Account>>;
    async fn insert_account(&mut self, account: &Account) -> Result<()>;
    /// Append to the account's order list. Entries are never removed.
    async fn append_account_order(&mut self, account_id: Uuid, order_id: Uuid) -> Result<()>;

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>>;
    async fn product_for_update(&mut self, id: Uuid) -> Result<Option<Product>>;
    async fn insert_product(&mut self, product: &Product) -> Result<()>;
    async fn save_product(&mut self, product: &Product) -> Result<()>;

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>>;
    async fn order_for_update(&mut self, id: Uuid) -> Result<Option<Order>>;
    async fn order_by_intent_for_update(&mut self, intent_id: &str) -> Result<Option<Order>>;
    /// Orders in the account's order-list sequence.
    async fn orders_for_account(&mut self, account_id: Uuid) -> Result<Vec<Order>>;
    async fn insert_order(&mut self, order: &Order) -> Result<()>;
    async fn save_order(&mut self, order: &Order) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
