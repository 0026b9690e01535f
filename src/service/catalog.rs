//! Catalog and account administration

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::{Caller, OrderService};
use crate::domain::aggregates::{Account, Product};
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingUpdate {
    pub price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
}

impl OrderService {
    pub async fn create_product(&self, caller: &Caller, new: NewProduct) -> Result<Product> {
        caller.require_admin()?;
        let product = Product::create(new.name, new.price, new.discount_percent, new.stock)?;
        let mut tx = self.store.begin().await?;
        tx.insert_product(&product).await?;
        tx.commit().await?;
        tracing::info!(product_id = %product.id(), name = product.name(), "Product created");
        Ok(product)
    }

    pub async fn product(&self, product_id: Uuid) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        tx.product(product_id)
            .await?
            .ok_or_else(|| EcommerceError::NotFound(format!("Product {product_id}")))
    }

    /// Change price and/or discount; the discounted price is recomputed.
    /// Orders already placed keep their snapshotted prices.
    pub async fn update_pricing(&self, caller: &Caller, product_id: Uuid, update: PricingUpdate) -> Result<Product> {
        caller.require_admin()?;
        if update.price.is_none() && update.discount_percent.is_none() {
            return Err(EcommerceError::validation("price", "price or discountPercent is required"));
        }
        self.with_deadline(async {
            let mut tx = self.store.begin().await?;
            let mut product = tx
                .product_for_update(product_id)
                .await?
                .ok_or_else(|| EcommerceError::NotFound(format!("Product {product_id}")))?;
            product.reprice(update.price, update.discount_percent)?;
            tx.save_product(&product).await?;
            tx.commit().await?;
            Ok(product)
        })
        .await
    }

    /// Return units to stock. Cancellation never does this on its own.
    pub async fn restock(&self, caller: &Caller, product_id: Uuid, quantity: u32) -> Result<Product> {
        caller.require_admin()?;
        let product = self
            .with_deadline(async {
                let mut tx = self.store.begin().await?;
                let mut product = tx
                    .product_for_update(product_id)
                    .await?
                    .ok_or_else(|| EcommerceError::NotFound(format!("Product {product_id}")))?;
                product.add_stock(quantity)?;
                tx.save_product(&product).await?;
                tx.commit().await?;
                Ok(product)
            })
            .await?;
        tracing::info!(product_id = %product_id, quantity, stock = product.stock(), "Product restocked");
        Ok(product)
    }

    /// Accounts are provisioned by the identity service; this only records them.
    pub async fn register_account(&self, username: &str, email: &str, is_admin: bool) -> Result<Account> {
        let account = Account::register(username, email, is_admin)?;
        let mut tx = self.store.begin().await?;
        tx.insert_account(&account).await?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn account(&self, account_id: Uuid) -> Result<Account> {
        let mut tx = self.store.begin().await?;
        tx.account(account_id)
            .await?
            .ok_or_else(|| EcommerceError::NotFound(format!("Account {account_id}")))
    }
}
