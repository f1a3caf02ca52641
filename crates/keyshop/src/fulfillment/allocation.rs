//! # Allocation Engine
//!
//! Binds one unused credential to one pending order. Every step runs inside
//! a single store transaction:
//!
//! 1. load the order; it must exist and be `pending`,
//! 2. claim the oldest available credential for its plan,
//! 3. mark the order approved with that credential,
//! 4. append the sale record,
//!
//! then commit. Any refusal or failure rolls the whole thing back, so a
//! credential is never left consumed without an approved order and a sale.
//!
//! There is no in-process lock here. Two engines (or two processes) racing
//! on the same order or the same plan are kept apart by the transaction
//! and by the `pending` guard on the status update.

use crate::model::{Credential, Days, OperatorId, Order, OrderId, OrderStatus, ProductId, SaleRecord};
use crate::store::{FulfillmentStore, FulfillmentTx, StoreError};
use chrono::{DateTime, SubsecRound, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Instrument};

/// Outcome of one allocation attempt.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order already {0}")]
    AlreadyDecided(OrderStatus),

    #[error("No {product} {duration} keys left")]
    OutOfStock { product: ProductId, duration: Days },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A committed allocation.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub order: Order,
    pub credential: Credential,
    pub sale: SaleRecord,
}

/// Decision timestamps are kept at the store's millisecond precision.
pub(crate) fn decision_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Clone)]
pub struct AllocationEngine {
    store: Arc<dyn FulfillmentStore>,
}

impl AllocationEngine {
    pub fn new(store: Arc<dyn FulfillmentStore>) -> Self {
        Self { store }
    }

    /// One attempt at approving `order_id`. Not retried here.
    ///
    /// The attempt runs to commit or rollback on its own task, so a caller
    /// that stops waiting never leaves the transaction half open.
    #[instrument(skip_all, fields(order_id = %order_id, operator = %operator))]
    pub async fn approve(
        &self,
        order_id: OrderId,
        operator: OperatorId,
    ) -> Result<Allocation, AllocationError> {
        run_detached(approve_once(self.store.clone(), order_id, operator)).await
    }
}

/// Drives one transactional attempt to completion on a spawned task.
///
/// Dropping the returned future detaches the task instead of cancelling it.
pub(crate) async fn run_detached<T, F>(attempt: F) -> Result<T, AllocationError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AllocationError>> + Send + 'static,
{
    tokio::spawn(attempt.in_current_span())
        .await
        .map_err(|err| AllocationError::Store(StoreError::Backend(Box::new(err))))?
}

async fn approve_once(
    store: Arc<dyn FulfillmentStore>,
    order_id: OrderId,
    operator: OperatorId,
) -> Result<Allocation, AllocationError> {
    let mut tx = store.begin().await?;
    let outcome = allocate(tx.as_mut(), order_id, operator, decision_time()).await;
    match outcome {
        Ok(allocation) => {
            tx.commit().await?;
            info!(
                product = %allocation.order.product,
                duration = %allocation.order.duration,
                credential_id = %allocation.credential.id,
                "Order approved"
            );
            Ok(allocation)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn allocate(
    tx: &mut dyn FulfillmentTx,
    order_id: OrderId,
    operator: OperatorId,
    at: DateTime<Utc>,
) -> Result<Allocation, AllocationError> {
    let order = tx
        .load_order(order_id)
        .await?
        .ok_or(AllocationError::OrderNotFound(order_id))?;
    if order.status.is_terminal() {
        return Err(AllocationError::AlreadyDecided(order.status));
    }

    let credential = tx
        .claim_oldest_available(&order.product, order.duration, order_id, at)
        .await?
        .ok_or_else(|| AllocationError::OutOfStock {
            product: order.product.clone(),
            duration: order.duration,
        })?;
    debug!(credential_id = %credential.id, "Credential claimed");

    if !tx
        .mark_approved(order_id, &credential.value, operator, at)
        .await?
    {
        let status = tx
            .load_order(order_id)
            .await?
            .map(|o| o.status)
            .ok_or(AllocationError::OrderNotFound(order_id))?;
        return Err(AllocationError::AlreadyDecided(status));
    }

    let sale = tx.append_sale(&order, &credential.value, at).await?;
    let order = tx
        .load_order(order_id)
        .await?
        .ok_or(AllocationError::OrderNotFound(order_id))?;

    Ok(Allocation {
        order,
        credential,
        sale,
    })
}
