//! # Public Errors
//!
//! [`DecisionError`] is what callers of the shop see. Storage and engine
//! errors are folded into it after the retry wrapper has had its say.

use crate::fulfillment::AllocationError;
use crate::model::{Days, OperatorId, OrderId, OrderStatus, ProductId};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order already {0}")]
    AlreadyDecided(OrderStatus),

    #[error("No {product} {duration} keys left")]
    OutOfStock { product: ProductId, duration: Days },

    #[error("Credential value already exists")]
    DuplicateCredentialValue,

    #[error("Storage unavailable after {attempts} attempts: {last_error}")]
    TransientFailure { attempts: u32, last_error: String },

    #[error("Not an operator: {0}")]
    Unauthorized(OperatorId),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

impl DecisionError {
    /// Business refusals that the caller reports as-is; retrying will not help.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            DecisionError::OrderNotFound(_)
                | DecisionError::AlreadyDecided(_)
                | DecisionError::OutOfStock { .. }
                | DecisionError::Unauthorized(_)
        )
    }
}

impl From<StoreError> for DecisionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => DecisionError::OrderNotFound(id),
            StoreError::DuplicateCredentialValue => DecisionError::DuplicateCredentialValue,
            other => DecisionError::Storage(other),
        }
    }
}

impl From<AllocationError> for DecisionError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::OrderNotFound(id) => DecisionError::OrderNotFound(id),
            AllocationError::AlreadyDecided(status) => DecisionError::AlreadyDecided(status),
            AllocationError::OutOfStock { product, duration } => {
                DecisionError::OutOfStock { product, duration }
            }
            AllocationError::Store(err) => err.into(),
        }
    }
}
