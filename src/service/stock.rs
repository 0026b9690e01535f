//! Stock reservation inside an open transaction

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::store::StoreTx;
use crate::{EcommerceError, Result};

/// Holds row locks on the products an order touches and applies reservations
/// to them. Locks are taken in ascending id order so two orders sharing
/// products cannot deadlock.
pub struct StockGuard<'a> {
    tx: &'a mut dyn StoreTx,
    locked: BTreeMap<Uuid, Product>,
}

impl<'a> StockGuard<'a> {
    pub async fn lock(tx: &'a mut dyn StoreTx, product_ids: impl IntoIterator<Item = Uuid>) -> Result<StockGuard<'a>> {
        let ids: std::collections::BTreeSet<Uuid> = product_ids.into_iter().collect();
        let mut locked = BTreeMap::new();
        for id in ids {
            let product = tx
                .product_for_update(id)
                .await?
                .ok_or_else(|| EcommerceError::NotFound(format!("Product {id}")))?;
            locked.insert(id, product);
        }
        Ok(Self { tx, locked })
    }

    /// Take `quantity` units of a locked product, returning the product as it
    /// stands after the reservation.
    pub fn reserve(&mut self, product_id: Uuid, quantity: u32) -> Result<&Product> {
        let product = self
            .locked
            .get_mut(&product_id)
            .ok_or_else(|| EcommerceError::NotFound(format!("Product {product_id}")))?;
        product.reserve(quantity)?;
        Ok(product)
    }

    /// Write the new stock levels back through the transaction.
    pub async fn persist(self) -> Result<()> {
        for product in self.locked.values() {
            self.tx.save_product(product).await?;
        }
        Ok(())
    }
}
