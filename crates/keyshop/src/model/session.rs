//! A buyer's in-progress checkout conversation.
//!
//! # Actor Framework
//! [`Session`] implements [`ActorEntity`](keyshop_actor::ActorEntity) in
//! [`crate::session_actor::entity`], keyed by [`BuyerId`]. The actor drops a
//! session once it produces a [`CheckoutDraft`] or once `expires_at` passes.

use crate::model::{BuyerId, Days, OrderCreate, ProductId};
use std::time::Duration;
use tokio::time::Instant;

/// Where the conversation currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    AwaitingProduct,
    AwaitingDuration {
        product: ProductId,
    },
    AwaitingProof {
        product: ProductId,
        duration: Days,
        amount: i64,
    },
    /// Proof accepted; the session is about to be dropped.
    Done,
}

impl SessionStep {
    pub fn name(&self) -> &'static str {
        match self {
            SessionStep::AwaitingProduct => "awaiting_product",
            SessionStep::AwaitingDuration { .. } => "awaiting_duration",
            SessionStep::AwaitingProof { .. } => "awaiting_proof",
            SessionStep::Done => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub buyer: BuyerId,
    pub buyer_name: String,
    pub step: SessionStep,
    pub expires_at: Instant,
    pub ttl: Duration,
}

impl Session {
    /// Pushes the deadline out by one full `ttl` from now.
    pub fn touch(&mut self) {
        self.expires_at = Instant::now() + self.ttl;
    }
}

/// Payload for starting (or restarting) a session.
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub buyer: BuyerId,
    pub buyer_name: String,
    pub ttl: Duration,
}

/// Everything `create_order` needs, produced by a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDraft {
    pub buyer: BuyerId,
    pub buyer_name: String,
    pub product: ProductId,
    pub duration: Days,
    pub amount: i64,
    pub proof: String,
}

impl From<CheckoutDraft> for OrderCreate {
    fn from(draft: CheckoutDraft) -> Self {
        OrderCreate {
            buyer: draft.buyer,
            buyer_name: draft.buyer_name,
            product: draft.product,
            duration: draft.duration,
            amount: draft.amount,
            proof: Some(draft.proof),
        }
    }
}
