//! # Storage Port
//!
//! The engine talks to persistence only through [`FulfillmentStore`] and the
//! transaction scope it opens, [`FulfillmentTx`]. Everything that must be
//! atomic (claiming a credential, closing an order, writing the sale) goes
//! through a single `FulfillmentTx`; the rest are plain reads and
//! single-row writes.
//!
//! A backend also ships a [`TransientClassifier`] so the retry wrapper can
//! tell a lock timeout from a business refusal without knowing the driver.

pub mod sqlite;

use crate::model::{
    BuyerId, Credential, Days, InventoryCount, NewCredential, OperatorId, Order, OrderCreate, OrderId,
    OrderStatus, Product, ProductId, RejectReason, RemoveOutcome, SaleRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use sqlite::{SqliteClassifier, SqliteStore};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Credential value already exists")]
    DuplicateCredentialValue,

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Storage backend error: {0}")]
    Backend(#[source] BoxError),
}

/// Decides whether a failed storage call is worth repeating.
pub trait TransientClassifier: Send + Sync {
    fn is_transient(&self, error: &StoreError) -> bool;
}

/// Non-transactional access plus the entry point to a transaction.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// Best-effort snapshot; never a reservation.
    async fn count_available(&self, product: &ProductId, duration: Days)
        -> Result<u64, StoreError>;

    /// Fails with [`StoreError::DuplicateCredentialValue`] if the value is
    /// already stocked under any product.
    async fn insert_credential(&self, new: NewCredential) -> Result<Credential, StoreError>;

    async fn delete_if_available(
        &self,
        product: &ProductId,
        duration: Days,
        value: &str,
    ) -> Result<RemoveOutcome, StoreError>;

    async fn credential_by_value(&self, value: &str) -> Result<Option<Credential>, StoreError>;

    /// Inserts a `pending` order.
    async fn create_order(&self, params: OrderCreate) -> Result<Order, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Newest first; `offset` skips that many for paging.
    async fn list_recent_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError>;

    async fn list_orders_by_status(
        &self,
        status: OrderStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, StoreError>;

    /// One buyer's orders, newest first.
    async fn list_orders_by_buyer(&self, buyer: BuyerId, limit: u32)
        -> Result<Vec<Order>, StoreError>;

    async fn inventory_summary(&self) -> Result<Vec<InventoryCount>, StoreError>;

    /// Newest first.
    async fn recent_sales(&self, limit: u32) -> Result<Vec<SaleRecord>, StoreError>;

    async fn sale_for_order(&self, id: OrderId) -> Result<Option<SaleRecord>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Opens the write transaction used for decisions.
    async fn begin(&self) -> Result<Box<dyn FulfillmentTx>, StoreError>;
}

/// One all-or-nothing unit of work. Dropping it without [`commit`] rolls
/// everything back.
///
/// [`commit`]: FulfillmentTx::commit
#[async_trait]
pub trait FulfillmentTx: Send {
    async fn load_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Marks the oldest available credential of the plan consumed and binds
    /// it to `order`, in one statement. `None` means the plan is empty.
    async fn claim_oldest_available(
        &mut self,
        product: &ProductId,
        duration: Days,
        order: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<Credential>, StoreError>;

    /// Applies only to a `pending` order; returns whether it did.
    async fn mark_approved(
        &mut self,
        id: OrderId,
        credential: &str,
        operator: OperatorId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Applies only to a `pending` order; returns whether it did.
    async fn mark_rejected(
        &mut self,
        id: OrderId,
        operator: OperatorId,
        reason: &RejectReason,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn append_sale(
        &mut self,
        order: &Order,
        credential: &str,
        at: DateTime<Utc>,
    ) -> Result<SaleRecord, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
