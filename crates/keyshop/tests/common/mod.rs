#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshop::catalog::Catalog;
use keyshop::config::Config;
use keyshop::fulfillment::{AllowList, OrderLifecycle, RetryPolicy};
use keyshop::model::{
    BuyerId, Credential, Days, InventoryCount, NewCredential, OperatorId, Order, OrderCreate,
    OrderId, OrderStatus, Product, ProductId, Recipient, RejectReason, RemoveOutcome, SaleRecord,
};
use keyshop::notify::{Notice, Notifier, NotifyError};
use keyshop::store::{
    FulfillmentStore, FulfillmentTx, SqliteClassifier, SqliteStore, StoreError,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const OPERATOR: OperatorId = OperatorId(1);
pub const OTHER_OPERATOR: OperatorId = OperatorId(2);

/// A migrated database in its own directory. Keep the `TempDir` alive.
pub async fn temp_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("keyshop.db")).await.unwrap();
    (dir, store)
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database.path = dir.path().join("keyshop.db");
    config.operators = vec![OPERATOR, OTHER_OPERATOR];
    config.retry = fast_retry();
    config
}

pub async fn lifecycle(store: Arc<dyn FulfillmentStore>) -> OrderLifecycle {
    let catalog = Catalog::load(store.as_ref()).await.unwrap();
    OrderLifecycle::new(
        store,
        catalog,
        Arc::new(AllowList::new([OPERATOR, OTHER_OPERATOR])),
        Arc::new(SqliteClassifier),
        fast_retry(),
    )
}

pub fn order_params(buyer: i64, product: &str, days: u32, amount: i64) -> OrderCreate {
    OrderCreate {
        buyer: BuyerId(buyer),
        buyer_name: format!("Buyer {buyer}"),
        product: ProductId::new(product),
        duration: Days(days),
        amount,
        proof: Some(format!("UTR-{buyer}")),
    }
}

pub async fn stock(store: &dyn FulfillmentStore, product: &str, days: u32, values: &[&str]) {
    for value in values {
        store
            .insert_credential(NewCredential::new(product, days, *value))
            .await
            .unwrap();
    }
}

/// Remembers every delivered notice.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Recipient, Notice)>>,
    fail_for: Mutex<Vec<Recipient>>,
}

impl RecordingNotifier {
    pub fn failing_for(recipient: Recipient) -> Self {
        let notifier = Self::default();
        notifier.fail_for.lock().unwrap().push(recipient);
        notifier
    }

    pub fn sent(&self) -> Vec<(Recipient, Notice)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: Recipient) -> Vec<Notice> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, notice)| notice)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: Recipient, notice: &Notice) -> Result<(), NotifyError> {
        if self.fail_for.lock().unwrap().contains(&recipient) {
            return Err(NotifyError::Unreachable(recipient));
        }
        self.sent.lock().unwrap().push((recipient, notice.clone()));
        Ok(())
    }
}

pub fn transient() -> StoreError {
    StoreError::Backend(Box::new(sqlx::Error::PoolTimedOut))
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Wraps a real store and injects transient failures into the decision
/// transaction: `begin_failures` failed `begin()` calls, then
/// `commit_failures` commits that roll back instead.
pub struct FlakyStore {
    inner: SqliteStore,
    begin_failures: AtomicU32,
    commit_failures: Arc<AtomicU32>,
    pub begins: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: SqliteStore, begin_failures: u32, commit_failures: u32) -> Self {
        Self {
            inner,
            begin_failures: AtomicU32::new(begin_failures),
            commit_failures: Arc::new(AtomicU32::new(commit_failures)),
            begins: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl FulfillmentStore for FlakyStore {
    async fn count_available(&self, product: &ProductId, duration: Days) -> Result<u64, StoreError> {
        self.inner.count_available(product, duration).await
    }

    async fn insert_credential(&self, new: NewCredential) -> Result<Credential, StoreError> {
        self.inner.insert_credential(new).await
    }

    async fn delete_if_available(
        &self,
        product: &ProductId,
        duration: Days,
        value: &str,
    ) -> Result<RemoveOutcome, StoreError> {
        self.inner.delete_if_available(product, duration, value).await
    }

    async fn credential_by_value(&self, value: &str) -> Result<Option<Credential>, StoreError> {
        self.inner.credential_by_value(value).await
    }

    async fn create_order(&self, params: OrderCreate) -> Result<Order, StoreError> {
        self.inner.create_order(params).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.inner.get_order(id).await
    }

    async fn list_recent_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError> {
        self.inner.list_recent_orders(limit, offset).await
    }

    async fn list_orders_by_status(
        &self,
        status: OrderStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, StoreError> {
        self.inner.list_orders_by_status(status, limit, offset).await
    }

    async fn list_orders_by_buyer(
        &self,
        buyer: BuyerId,
        limit: u32,
    ) -> Result<Vec<Order>, StoreError> {
        self.inner.list_orders_by_buyer(buyer, limit).await
    }

    async fn inventory_summary(&self) -> Result<Vec<InventoryCount>, StoreError> {
        self.inner.inventory_summary().await
    }

    async fn recent_sales(&self, limit: u32) -> Result<Vec<SaleRecord>, StoreError> {
        self.inner.recent_sales(limit).await
    }

    async fn sale_for_order(&self, id: OrderId) -> Result<Option<SaleRecord>, StoreError> {
        self.inner.sale_for_order(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.inner.list_products().await
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.inner.upsert_product(product).await
    }

    async fn begin(&self) -> Result<Box<dyn FulfillmentTx>, StoreError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.begin_failures) {
            return Err(transient());
        }
        Ok(Box::new(FlakyTx {
            inner: self.inner.begin().await?,
            commit_failures: self.commit_failures.clone(),
        }))
    }
}

struct FlakyTx {
    inner: Box<dyn FulfillmentTx>,
    commit_failures: Arc<AtomicU32>,
}

#[async_trait]
impl FulfillmentTx for FlakyTx {
    async fn load_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.load_order(id).await
    }

    async fn claim_oldest_available(
        &mut self,
        product: &ProductId,
        duration: Days,
        order: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<Credential>, StoreError> {
        self.inner
            .claim_oldest_available(product, duration, order, at)
            .await
    }

    async fn mark_approved(
        &mut self,
        id: OrderId,
        credential: &str,
        operator: OperatorId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.mark_approved(id, credential, operator, at).await
    }

    async fn mark_rejected(
        &mut self,
        id: OrderId,
        operator: OperatorId,
        reason: &RejectReason,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.mark_rejected(id, operator, reason, at).await
    }

    async fn append_sale(
        &mut self,
        order: &Order,
        credential: &str,
        at: DateTime<Utc>,
    ) -> Result<SaleRecord, StoreError> {
        self.inner.append_sale(order, credential, at).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if take_one(&self.commit_failures) {
            self.inner.rollback().await?;
            return Err(transient());
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}
