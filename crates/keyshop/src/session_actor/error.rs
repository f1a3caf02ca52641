//! Error types for the conversation session actor.

use crate::model::{Days, ProductId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot start session: {0}")]
    InvalidStart(String),

    /// No live session for this buyer, or it timed out.
    #[error("No active session")]
    NoSession,

    #[error("Not expected while {step}")]
    WrongStep { step: &'static str },

    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error("No {0} plan")]
    UnknownPlan(Days),

    /// Display-only snapshot; the order itself is never refused for stock.
    #[error("{product} {duration} is out of stock")]
    OutOfStock { product: ProductId, duration: Days },

    #[error("Payment proof is empty")]
    EmptyProof,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
