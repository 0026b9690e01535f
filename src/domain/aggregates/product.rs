//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::discounted_price;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) price: Decimal,
    pub(crate) discount_percent: Decimal,
    pub(crate) price_after_discount: Decimal,
    pub(crate) stock: u32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Decimal, discount_percent: Decimal, stock: u32) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() { return Err(EcommerceError::validation("name", "is required")); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name, price, discount_percent,
            price_after_discount: discounted_price(price, discount_percent)?,
            stock, created_at: now, updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> Decimal { self.price }
    pub fn discount_percent(&self) -> Decimal { self.discount_percent }
    pub fn price_after_discount(&self) -> Decimal { self.price_after_discount }
    pub fn stock(&self) -> u32 { self.stock }

    /// Change price and/or discount, keeping the derived price consistent.
    pub fn reprice(&mut self, price: Option<Decimal>, discount_percent: Option<Decimal>) -> Result<()> {
        let price = price.unwrap_or(self.price);
        let discount = discount_percent.unwrap_or(self.discount_percent);
        self.price_after_discount = discounted_price(price, discount)?;
        self.price = price;
        self.discount_percent = discount;
        self.touch();
        Ok(())
    }

    pub fn add_stock(&mut self, qty: u32) -> Result<u32> {
        if qty == 0 { return Err(EcommerceError::validation("quantity", "must be greater than 0")); }
        self.stock = self.stock.checked_add(qty).ok_or_else(|| EcommerceError::validation("quantity", "is too large"))?;
        self.touch();
        Ok(self.stock)
    }

    /// Take `qty` units out of stock. Stock never goes below zero.
    pub fn reserve(&mut self, qty: u32) -> Result<u32> {
        self.stock = self.stock.checked_sub(qty).ok_or(EcommerceError::InsufficientStock {
            product_id: self.id, requested: qty, available: self.stock,
        })?;
        self.touch();
        Ok(self.stock)
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
