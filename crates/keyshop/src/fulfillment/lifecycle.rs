//! # Order Lifecycle Controller
//!
//! `pending` → `approved` | `rejected`, nothing else. The controller checks
//! who is asking, validates new orders, and routes decisions: approvals to
//! the [`AllocationEngine`], rejections to its own transaction. Both go
//! through the [`RetryPolicy`].
//!
//! A decision on an order that is no longer `pending` changes nothing and
//! comes back as [`DecisionError::AlreadyDecided`] with the current status.

use super::allocation::{decision_time, run_detached, Allocation, AllocationEngine, AllocationError};
use super::retry::RetryPolicy;
use crate::catalog::{plan_price, Catalog};
use crate::error::DecisionError;
use crate::model::{Decision, OperatorId, Order, OrderCreate, OrderId, OrderStatus, RejectReason, SaleRecord};
use crate::store::{FulfillmentStore, FulfillmentTx, TransientClassifier};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Answers "may this person decide orders?". Supplied from outside.
pub trait OperatorGate: Send + Sync {
    fn is_operator(&self, id: OperatorId) -> bool;
}

/// Fixed set of operator ids.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: HashSet<OperatorId>,
}

impl AllowList {
    pub fn new(ids: impl IntoIterator<Item = OperatorId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl OperatorGate for AllowList {
    fn is_operator(&self, id: OperatorId) -> bool {
        self.ids.contains(&id)
    }
}

/// Result of a decision that changed the order.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub order: Order,
    /// Present for approvals.
    pub sale: Option<SaleRecord>,
}

impl DecisionOutcome {
    pub fn status(&self) -> OrderStatus {
        self.order.status
    }

    pub fn credential(&self) -> Option<&str> {
        self.order.credential.as_deref()
    }
}

impl From<Allocation> for DecisionOutcome {
    fn from(allocation: Allocation) -> Self {
        Self {
            order: allocation.order,
            sale: Some(allocation.sale),
        }
    }
}

#[derive(Clone)]
pub struct OrderLifecycle {
    store: Arc<dyn FulfillmentStore>,
    engine: AllocationEngine,
    catalog: Catalog,
    gate: Arc<dyn OperatorGate>,
    classifier: Arc<dyn TransientClassifier>,
    retry: RetryPolicy,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn FulfillmentStore>,
        catalog: Catalog,
        gate: Arc<dyn OperatorGate>,
        classifier: Arc<dyn TransientClassifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine: AllocationEngine::new(store.clone()),
            store,
            catalog,
            gate,
            classifier,
            retry,
        }
    }

    /// Validates and stores a new `pending` order.
    #[instrument(skip_all, fields(buyer = %params.buyer, product = %params.product, duration = %params.duration))]
    pub async fn create_order(&self, mut params: OrderCreate) -> Result<Order, DecisionError> {
        params.buyer_name = params.buyer_name.trim().to_string();
        if params.buyer_name.is_empty() {
            return Err(DecisionError::InvalidOrder("buyer name is empty".to_string()));
        }
        if !self.catalog.is_listed(&params.product).await {
            return Err(DecisionError::InvalidOrder(format!(
                "product {} is not on sale",
                params.product
            )));
        }
        if plan_price(params.duration).is_none() {
            return Err(DecisionError::InvalidOrder(format!(
                "no {} plan",
                params.duration
            )));
        }
        if params.amount <= 0 {
            return Err(DecisionError::InvalidOrder(format!(
                "amount must be positive, got {}",
                params.amount
            )));
        }

        let order = self.store.create_order(params).await?;
        info!(order_id = %order.id, amount = order.amount, "Order created");
        Ok(order)
    }

    /// The only mutating entry point for an existing order.
    #[instrument(skip_all, fields(order_id = %order_id, decision = decision.label(), operator = %operator))]
    pub async fn submit_decision(
        &self,
        order_id: OrderId,
        decision: Decision,
        operator: OperatorId,
    ) -> Result<DecisionOutcome, DecisionError> {
        if !self.gate.is_operator(operator) {
            warn!("Decision from non-operator refused");
            return Err(DecisionError::Unauthorized(operator));
        }

        let result = match &decision {
            Decision::Approve => self
                .retry
                .run(self.classifier.as_ref(), || self.engine.approve(order_id, operator))
                .await
                .map(DecisionOutcome::from),
            Decision::Reject(reason) => self
                .retry
                .run(self.classifier.as_ref(), || {
                    run_detached(reject_once(
                        self.store.clone(),
                        order_id,
                        operator,
                        reason.clone(),
                    ))
                })
                .await
                .map(|order| DecisionOutcome { order, sale: None }),
        };

        if let Err(err) = &result {
            if err.is_business() {
                warn!(error = %err, "Decision refused");
            }
        }
        result
    }
}

async fn reject_once(
    store: Arc<dyn FulfillmentStore>,
    order_id: OrderId,
    operator: OperatorId,
    reason: RejectReason,
) -> Result<Order, AllocationError> {
    let mut tx = store.begin().await?;
    let outcome = reject_in(tx.as_mut(), order_id, operator, &reason).await;
    match outcome {
        Ok(order) => {
            tx.commit().await?;
            info!(reason = reason.code(), "Order rejected");
            Ok(order)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn reject_in(
    tx: &mut dyn FulfillmentTx,
    order_id: OrderId,
    operator: OperatorId,
    reason: &RejectReason,
) -> Result<Order, AllocationError> {
    let order = tx
        .load_order(order_id)
        .await?
        .ok_or(AllocationError::OrderNotFound(order_id))?;
    if order.status.is_terminal() {
        return Err(AllocationError::AlreadyDecided(order.status));
    }

    if !tx
        .mark_rejected(order_id, operator, reason, decision_time())
        .await?
    {
        let status = tx
            .load_order(order_id)
            .await?
            .map(|o| o.status)
            .ok_or(AllocationError::OrderNotFound(order_id))?;
        return Err(AllocationError::AlreadyDecided(status));
    }

    tx.load_order(order_id)
        .await?
        .ok_or(AllocationError::OrderNotFound(order_id))
}
