use crate::catalog::{plan_price, Catalog};
use crate::clients::SessionClient;
use crate::config::Config;
use crate::error::DecisionError;
use crate::fulfillment::{AllowList, DecisionOutcome, OrderLifecycle};
use crate::model::{
    BuyerId, CheckoutDraft, Credential, Days, Decision, InventoryCount, NewCredential, OperatorId, Order,
    OrderCreate, OrderId, OrderStatus, Product, ProductId, Recipient, RemoveOutcome, SaleRecord,
};
use crate::notify::{DispatchHandle, Notice, NotificationDispatcher, Notifier};
use crate::session_actor::{self, SessionContext};
use crate::store::{FulfillmentStore, SqliteClassifier, SqliteStore, StoreError, TransientClassifier};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

const NOTICE_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Actor task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// The running shop.
///
/// `KeyShop` owns:
/// - the order lifecycle (and through it the allocation engine and retry policy)
/// - the notification dispatcher task
/// - the session actor task
///
/// Decisions never go through an actor; any number of them may run at once
/// and the store's transaction keeps them apart.
///
/// ```ignore
/// let shop = KeyShop::open(&Config::from_env()?, Arc::new(LogNotifier)).await?;
/// let order = shop.create_order(params).await?;
/// shop.decide(order.id, Decision::Approve, operator).await?;
/// shop.shutdown().await?;
/// ```
pub struct KeyShop {
    store: Arc<dyn FulfillmentStore>,
    catalog: Catalog,
    lifecycle: OrderLifecycle,
    operators: Vec<OperatorId>,
    notices: DispatchHandle,
    sessions: SessionClient,
    handles: Vec<JoinHandle<()>>,
    sqlite: Option<SqliteStore>,
}

impl KeyShop {
    /// Opens (and migrates) the SQLite database named in `config` and starts
    /// the shop on it.
    pub async fn open(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, ShopError> {
        let sqlite = SqliteStore::connect(&config.database).await?;
        let mut shop = Self::start(
            Arc::new(sqlite.clone()),
            Arc::new(SqliteClassifier),
            notifier,
            config,
        )
        .await?;
        shop.sqlite = Some(sqlite);
        Ok(shop)
    }

    /// Starts the shop on any store backend.
    pub async fn start(
        store: Arc<dyn FulfillmentStore>,
        classifier: Arc<dyn TransientClassifier>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Result<Self, ShopError> {
        let catalog = Catalog::load(store.as_ref()).await?;
        let lifecycle = OrderLifecycle::new(
            store.clone(),
            catalog.clone(),
            Arc::new(AllowList::new(config.operators.iter().copied())),
            classifier,
            config.retry.clone(),
        );

        let (dispatcher, notices) = NotificationDispatcher::new(NOTICE_BUFFER, notifier);
        let dispatcher_handle = tokio::spawn(dispatcher.run());

        let (session_actor, session_client) = session_actor::new();
        let session_handle = tokio::spawn(session_actor.run(SessionContext {
            catalog: catalog.clone(),
            store: store.clone(),
        }));

        info!(operators = config.operators.len(), "Shop started");

        Ok(Self {
            store,
            catalog,
            lifecycle,
            operators: config.operators.clone(),
            notices,
            sessions: SessionClient::new(session_client, config.session_ttl),
            handles: vec![dispatcher_handle, session_handle],
            sqlite: None,
        })
    }

    pub fn sessions(&self) -> &SessionClient {
        &self.sessions
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Stores a new `pending` order and tells every operator about it.
    #[instrument(skip(self))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<Order, DecisionError> {
        let order = self.lifecycle.create_order(params).await?;
        for &operator in &self.operators {
            self.notices
                .send(Recipient::Operator(operator), Notice::NewOrder(order.clone()));
        }
        Ok(order)
    }

    /// Turns a finished checkout conversation into an order.
    pub async fn checkout(&self, draft: CheckoutDraft) -> Result<Order, DecisionError> {
        self.create_order(draft.into()).await
    }

    /// Approves or rejects a pending order, then tells the buyer and the
    /// deciding operator. Notification trouble never changes the result.
    #[instrument(skip(self))]
    pub async fn decide(
        &self,
        order_id: OrderId,
        decision: Decision,
        operator: OperatorId,
    ) -> Result<DecisionOutcome, DecisionError> {
        let result = self
            .lifecycle
            .submit_decision(order_id, decision, operator)
            .await;

        match &result {
            Ok(outcome) => self.announce(outcome, operator),
            Err(DecisionError::OutOfStock { product, duration }) => {
                self.announce_out_of_stock(order_id, product, *duration, operator)
                    .await
            }
            Err(_) => {}
        }
        result
    }

    fn announce(&self, outcome: &DecisionOutcome, operator: OperatorId) {
        let order = &outcome.order;
        let buyer = Recipient::Buyer(order.buyer);
        match order.status {
            OrderStatus::Approved => match (&order.credential, order.valid_until()) {
                (Some(credential), Some(valid_until)) => self.notices.send(
                    buyer,
                    Notice::CredentialDelivered {
                        order_id: order.id,
                        product: order.product.clone(),
                        duration: order.duration,
                        credential: credential.clone(),
                        valid_until,
                    },
                ),
                _ => error!(order_id = %order.id, "Approved order is missing its credential"),
            },
            OrderStatus::Rejected => {
                if let Some(reason) = &order.reject_reason {
                    self.notices.send(
                        buyer,
                        Notice::OrderRejected {
                            order_id: order.id,
                            reason: reason.clone(),
                        },
                    );
                }
            }
            OrderStatus::Pending => {}
        }
        self.notices.send(
            Recipient::Operator(operator),
            Notice::DecisionConfirmed {
                order_id: order.id,
                status: order.status,
                credential: order.credential.clone(),
            },
        );
    }

    async fn announce_out_of_stock(
        &self,
        order_id: OrderId,
        product: &ProductId,
        duration: Days,
        operator: OperatorId,
    ) {
        self.notices.send(
            Recipient::Operator(operator),
            Notice::OutOfStock {
                order_id,
                product: product.clone(),
                duration,
            },
        );
        match self.store.get_order(order_id).await {
            Ok(order) => self.notices.send(
                Recipient::Buyer(order.buyer),
                Notice::PlanUnavailable {
                    order_id,
                    product: product.clone(),
                    duration,
                },
            ),
            Err(e) => warn!(%order_id, error = %e, "Could not look up buyer for out-of-stock notice"),
        }
    }

    /// Best-effort count of unsold keys. Display only.
    #[instrument(skip(self))]
    pub async fn availability(
        &self,
        product: &ProductId,
        duration: Days,
    ) -> Result<u64, DecisionError> {
        Ok(self.store.count_available(product, duration).await?)
    }

    pub async fn add_credential(&self, new: NewCredential) -> Result<Credential, DecisionError> {
        let value = new.value.trim();
        if value.is_empty() {
            return Err(DecisionError::InvalidCredential("value is empty".to_string()));
        }
        if self.catalog.get(&new.product).await.is_none() {
            return Err(DecisionError::InvalidCredential(format!(
                "unknown product {}",
                new.product
            )));
        }
        if plan_price(new.duration).is_none() {
            return Err(DecisionError::InvalidCredential(format!(
                "no {} plan",
                new.duration
            )));
        }

        let credential = self
            .store
            .insert_credential(NewCredential {
                value: value.to_string(),
                ..new
            })
            .await?;
        info!(
            credential_id = %credential.id,
            product = %credential.product,
            duration = %credential.duration,
            "Credential added"
        );
        Ok(credential)
    }

    /// Deletes an unsold credential. Sold ones stay as the record of the sale.
    pub async fn remove_credential(
        &self,
        product: &ProductId,
        duration: Days,
        value: &str,
    ) -> Result<RemoveOutcome, DecisionError> {
        let outcome = self
            .store
            .delete_if_available(product, duration, value.trim())
            .await?;
        if outcome == RemoveOutcome::Removed {
            info!(%product, %duration, "Credential removed");
        }
        Ok(outcome)
    }

    pub async fn inventory_summary(&self) -> Result<Vec<InventoryCount>, DecisionError> {
        Ok(self.store.inventory_summary().await?)
    }

    /// Newest first.
    pub async fn recent_sales(&self, limit: u32) -> Result<Vec<SaleRecord>, DecisionError> {
        Ok(self.store.recent_sales(limit).await?)
    }

    pub async fn sale_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<SaleRecord>, DecisionError> {
        Ok(self.store.sale_for_order(order_id).await?)
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Order, DecisionError> {
        Ok(self.store.get_order(order_id).await?)
    }

    /// Newest first. Page `n` (0-based) is `offset = n * limit`.
    pub async fn recent_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, DecisionError> {
        Ok(self.store.list_recent_orders(limit, offset).await?)
    }

    pub async fn orders_with_status(
        &self,
        status: OrderStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, DecisionError> {
        Ok(self.store.list_orders_by_status(status, limit, offset).await?)
    }

    /// The buyer's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn orders_for_buyer(
        &self,
        buyer: BuyerId,
        limit: u32,
    ) -> Result<Vec<Order>, DecisionError> {
        Ok(self.store.list_orders_by_buyer(buyer, limit).await?)
    }

    /// Products currently on sale.
    pub async fn products(&self) -> Vec<Product> {
        self.catalog.products().await
    }

    /// Adds or edits a product and reloads the catalog.
    pub async fn upsert_product(&self, product: Product) -> Result<(), DecisionError> {
        if product.id.as_str().trim().is_empty() || product.name.trim().is_empty() {
            return Err(DecisionError::InvalidOrder(
                "product id and name must not be empty".to_string(),
            ));
        }
        self.store.upsert_product(&product).await?;
        self.catalog.refresh(self.store.as_ref()).await?;
        Ok(())
    }

    pub async fn refresh_catalog(&self) -> Result<usize, DecisionError> {
        Ok(self.catalog.refresh(self.store.as_ref()).await?)
    }

    /// Closes the actors, waits for queued notices to go out, then closes
    /// the database.
    pub async fn shutdown(self) -> Result<(), ShopError> {
        info!("Shutting down shop");

        drop(self.sessions);
        drop(self.notices);
        drop(self.lifecycle);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(e.into());
            }
        }

        if let Some(sqlite) = self.sqlite {
            sqlite.close().await;
        }
        info!("Shop shutdown complete");
        Ok(())
    }
}
