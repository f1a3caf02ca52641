//! # Catalog
//!
//! The static plan table and a refreshable cache of the product list.
//!
//! The cache is an explicit value handed to whoever needs product lookups;
//! nothing reads the product list as global state. Call
//! [`Catalog::refresh`] after products change in the store.

use crate::model::{Days, Product, ProductId};
use crate::store::{FulfillmentStore, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Sellable durations and their prices.
pub const PLANS: [(u32, i64); 6] = [(1, 120), (3, 299), (7, 499), (15, 699), (30, 999), (60, 1499)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub duration: Days,
    pub price: i64,
}

/// Price of a plan, or `None` if the duration is not sold.
pub fn plan_price(duration: Days) -> Option<i64> {
    PLANS
        .iter()
        .find(|(days, _)| *days == duration.0)
        .map(|(_, price)| *price)
}

pub fn plans() -> impl Iterator<Item = Plan> {
    PLANS.iter().map(|&(days, price)| Plan {
        duration: Days(days),
        price,
    })
}

#[derive(Clone, Default)]
pub struct Catalog {
    products: Arc<RwLock<BTreeMap<ProductId, Product>>>,
}

impl Catalog {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn load(store: &dyn FulfillmentStore) -> Result<Self, StoreError> {
        let catalog = Self::default();
        catalog.refresh(store).await?;
        Ok(catalog)
    }

    /// Replaces the cached list with the store's. Returns how many products
    /// are now listed.
    pub async fn refresh(&self, store: &dyn FulfillmentStore) -> Result<usize, StoreError> {
        let fresh: BTreeMap<_, _> = store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let listed = fresh.values().filter(|p| p.active).count();
        *self.products.write().await = fresh;
        info!(listed, "Catalog refreshed");
        Ok(listed)
    }

    /// Active products, ordered by id.
    pub async fn products(&self) -> Vec<Product> {
        self.products
            .read()
            .await
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &ProductId) -> Option<Product> {
        self.products.read().await.get(id).cloned()
    }

    /// `true` if the product exists and is on sale.
    pub async fn is_listed(&self, id: &ProductId) -> bool {
        self.products
            .read()
            .await
            .get(id)
            .is_some_and(|p| p.active)
    }
}
