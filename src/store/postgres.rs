//! PostgreSQL store
//!
//! Line items, delivery address and status history are stored as JSONB on the
//! order row so the audit trail survives as one document. Row locks come from
//! `SELECT ... FOR UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::domain::aggregates::{Account, LineItem, Order, Product, StatusChange};
use crate::domain::value_objects::DeliveryAddress;
use crate::{EcommerceError, Result};

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self {
        EcommerceError::Storage(e.to_string())
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, price, discount_percent, price_after_discount, stock, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, account_id, line_items, total_amount, currency, delivery_address, \
     payment_method, payment_status, status, status_history, payment_intent_id, payment_confirmation_id, \
     cancel_reason, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    is_admin: bool,
    order_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Account { id: r.id, username: r.username, email: r.email, is_admin: r.is_admin, orders: r.order_ids, created_at: r.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    discount_percent: Decimal,
    price_after_discount: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = EcommerceError;
    fn try_from(r: ProductRow) -> Result<Self> {
        let stock = u32::try_from(r.stock).map_err(|_| EcommerceError::Storage(format!("product {} has negative stock", r.id)))?;
        Ok(Product {
            id: r.id, name: r.name, price: r.price, discount_percent: r.discount_percent,
            price_after_discount: r.price_after_discount, stock, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    account_id: Uuid,
    line_items: Json<Vec<LineItem>>,
    total_amount: Decimal,
    currency: String,
    delivery_address: Json<DeliveryAddress>,
    payment_method: String,
    payment_status: String,
    status: String,
    status_history: Json<Vec<StatusChange>>,
    payment_intent_id: String,
    payment_confirmation_id: Option<String>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id, order_number: r.order_number.into(), account_id: r.account_id, line_items: r.line_items.0,
            total_amount: r.total_amount, currency: r.currency, delivery_address: r.delivery_address.0,
            payment_method: r.payment_method.parse()?, payment_status: r.payment_status.parse()?, status: r.status.parse()?,
            status_history: r.status_history.0, payment_intent_id: r.payment_intent_id,
            payment_confirmation_id: r.payment_confirmation_id, cancel_reason: r.cancel_reason,
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

fn stock_column(product: &Product) -> Result<i32> {
    i32::try_from(product.stock).map_err(|_| EcommerceError::validation("stock", "is too large"))
}

impl PgTx {
    async fn fetch_product(&mut self, id: Uuid, lock: bool) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1{}", if lock { " FOR UPDATE" } else { "" });
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn fetch_order(&mut self, filter: &str, key: OrderKey<'_>, lock: bool) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} = $1{}", if lock { " FOR UPDATE" } else { "" });
        let query = sqlx::query_as::<_, OrderRow>(&sql);
        let query = match key {
            OrderKey::Id(id) => query.bind(id),
            OrderKey::Intent(intent) => query.bind(intent),
        };
        query.fetch_optional(&mut *self.tx).await?.map(Order::try_from).transpose()
    }
}

enum OrderKey<'a> {
    Id(Uuid),
    Intent(&'a str),
}

#[async_trait]
impl StoreTx for PgTx {
    async fn account(&mut self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, username, email, is_admin, order_ids, created_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn insert_account(&mut self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (id, username, email, is_admin, order_ids, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(account.is_admin)
        .bind(&account.orders)
        .bind(account.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn append_account_order(&mut self, account_id: Uuid, order_id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET order_ids = array_append(order_ids, $2) WHERE id = $1")
            .bind(account_id)
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EcommerceError::NotFound(format!("Account {account_id}")));
        }
        Ok(())
    }

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        self.fetch_product(id, false).await
    }

    async fn product_for_update(&mut self, id: Uuid) -> Result<Option<Product>> {
        self.fetch_product(id, true).await
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        sqlx::query(&format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"))
            .bind(product.id)
            .bind(&product.name)
            .bind(product.price)
            .bind(product.discount_percent)
            .bind(product.price_after_discount)
            .bind(stock_column(product)?)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET name = $2, price = $3, discount_percent = $4, price_after_discount = $5, \
             stock = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.discount_percent)
        .bind(product.price_after_discount)
        .bind(stock_column(product)?)
        .bind(product.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EcommerceError::NotFound(format!("Product {}", product.id)));
        }
        Ok(())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        self.fetch_order("id", OrderKey::Id(id), false).await
    }

    async fn order_for_update(&mut self, id: Uuid) -> Result<Option<Order>> {
        self.fetch_order("id", OrderKey::Id(id), true).await
    }

    async fn order_by_intent_for_update(&mut self, intent_id: &str) -> Result<Option<Order>> {
        self.fetch_order("payment_intent_id", OrderKey::Intent(intent_id), true).await
    }

    async fn orders_for_account(&mut self, account_id: Uuid) -> Result<Vec<Order>> {
        let columns = ORDER_COLUMNS.split(", ").map(|c| format!("o.{c}")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT {columns} FROM accounts a \
             CROSS JOIN LATERAL unnest(a.order_ids) WITH ORDINALITY AS l(order_id, pos) \
             JOIN orders o ON o.id = l.order_id \
             WHERE a.id = $1 ORDER BY l.pos"
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(account_id)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(order.id)
        .bind(order.order_number.as_str())
        .bind(order.account_id)
        .bind(Json(&order.line_items))
        .bind(order.total_amount)
        .bind(&order.currency)
        .bind(Json(&order.delivery_address))
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(Json(&order.status_history))
        .bind(&order.payment_intent_id)
        .bind(&order.payment_confirmation_id)
        .bind(&order.cancel_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_order(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = $2, status = $3, status_history = $4, \
             payment_confirmation_id = $5, cancel_reason = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(Json(&order.status_history))
        .bind(&order.payment_confirmation_id)
        .bind(&order.cancel_reason)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EcommerceError::NotFound(format!("Order {}", order.id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
