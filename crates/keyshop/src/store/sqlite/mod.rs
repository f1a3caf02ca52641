//! # SQLite Backend
//!
//! [`SqliteStore`] owns a WAL-mode pool. Schema lives in `migrations/` and is
//! applied on connect.

mod classify;
mod inventory;
mod orders;
mod products;
mod rows;
mod sales;
mod tx;

pub use classify::SqliteClassifier;
pub use tx::SqliteTx;

use crate::config::DatabaseConfig;
use crate::model::{
    BuyerId, Credential, Days, InventoryCount, NewCredential, Order, OrderCreate, OrderId, OrderStatus,
    Product, ProductId, RemoveOutcome, SaleRecord,
};
use crate::store::{FulfillmentStore, FulfillmentTx, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database file and applies migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Database connection established"
        );

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Shorthand for [`connect`](Self::connect) with default pool settings.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let config = DatabaseConfig {
            path: path.as_ref().to_path_buf(),
            ..DatabaseConfig::default()
        };
        Self::connect(&config).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl FulfillmentStore for SqliteStore {
    async fn count_available(
        &self,
        product: &ProductId,
        duration: Days,
    ) -> Result<u64, StoreError> {
        inventory::count_available(&self.pool, product, duration).await
    }

    async fn insert_credential(&self, new: NewCredential) -> Result<Credential, StoreError> {
        debug!(product = %new.product, duration = %new.duration, "Insert credential");
        inventory::insert(&self.pool, new).await
    }

    async fn delete_if_available(
        &self,
        product: &ProductId,
        duration: Days,
        value: &str,
    ) -> Result<RemoveOutcome, StoreError> {
        inventory::delete_if_available(&self.pool, product, duration, value).await
    }

    async fn credential_by_value(&self, value: &str) -> Result<Option<Credential>, StoreError> {
        inventory::by_value(&self.pool, value).await
    }

    async fn create_order(&self, params: OrderCreate) -> Result<Order, StoreError> {
        orders::create(&self.pool, params).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        orders::fetch(&self.pool, id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn list_recent_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError> {
        orders::list_recent(&self.pool, limit, offset).await
    }

    async fn list_orders_by_status(
        &self,
        status: OrderStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, StoreError> {
        orders::list_by_status(&self.pool, status, limit, offset).await
    }

    async fn list_orders_by_buyer(
        &self,
        buyer: BuyerId,
        limit: u32,
    ) -> Result<Vec<Order>, StoreError> {
        orders::list_by_buyer(&self.pool, buyer, limit).await
    }

    async fn inventory_summary(&self) -> Result<Vec<InventoryCount>, StoreError> {
        inventory::summary(&self.pool).await
    }

    async fn recent_sales(&self, limit: u32) -> Result<Vec<SaleRecord>, StoreError> {
        sales::recent(&self.pool, limit).await
    }

    async fn sale_for_order(&self, id: OrderId) -> Result<Option<SaleRecord>, StoreError> {
        sales::for_order(&self.pool, id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        products::list(&self.pool).await
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        products::upsert(&self.pool, product).await
    }

    async fn begin(&self) -> Result<Box<dyn FulfillmentTx>, StoreError> {
        Ok(Box::new(SqliteTx::begin(&self.pool).await?))
    }
}
