//! # Notifications
//!
//! Outbound messages to buyers and operators. Delivery is fire-and-forget:
//! a decision is final once committed, whether or not anyone hears about it.
//! The chat transport plugs in behind [`Notifier`].

pub mod dispatcher;

pub use dispatcher::{DispatchHandle, NotificationDispatcher};

use crate::model::{Days, Order, OrderId, OrderStatus, ProductId, Recipient, RejectReason};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// To every operator when a buyer submits proof.
    NewOrder(Order),
    CredentialDelivered {
        order_id: OrderId,
        product: ProductId,
        duration: Days,
        credential: String,
        valid_until: DateTime<Utc>,
    },
    OrderRejected {
        order_id: OrderId,
        reason: RejectReason,
    },
    /// Buyer side of an approval that found the plan empty.
    PlanUnavailable {
        order_id: OrderId,
        product: ProductId,
        duration: Days,
    },
    /// Operator side of the same.
    OutOfStock {
        order_id: OrderId,
        product: ProductId,
        duration: Days,
    },
    DecisionConfirmed {
        order_id: OrderId,
        status: OrderStatus,
        credential: Option<String>,
    },
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::NewOrder(order) => write!(
                f,
                "New order {}: {} ({}) wants {} {} for {}, proof: {}",
                order.id,
                order.buyer_name,
                order.buyer,
                order.product,
                order.duration,
                order.amount,
                order.proof.as_deref().unwrap_or("none"),
            ),
            Notice::CredentialDelivered {
                product,
                duration,
                credential,
                valid_until,
                ..
            } => write!(
                f,
                "Payment verified. Your {product} {duration} key: {credential} (valid until {})",
                valid_until.format("%Y-%m-%d")
            ),
            Notice::OrderRejected { order_id, reason } => {
                write!(f, "Order {order_id} was rejected: {reason}")
            }
            Notice::PlanUnavailable {
                product, duration, ..
            } => write!(
                f,
                "{product} {duration} is temporarily out of stock. Your order stays open."
            ),
            Notice::OutOfStock {
                order_id,
                product,
                duration,
            } => write!(
                f,
                "Cannot approve {order_id}: no {product} {duration} keys left"
            ),
            Notice::DecisionConfirmed {
                order_id,
                status,
                credential,
            } => match credential {
                Some(value) => write!(f, "Order {order_id} {status}, key {value} assigned"),
                None => write!(f, "Order {order_id} {status}"),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Recipient unreachable: {0}")]
    Unreachable(Recipient),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: Recipient, notice: &Notice) -> Result<(), NotifyError>;
}

/// Writes every notice to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: Recipient, notice: &Notice) -> Result<(), NotifyError> {
        info!(%recipient, "{notice}");
        Ok(())
    }
}
