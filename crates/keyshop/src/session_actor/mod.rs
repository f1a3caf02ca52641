//! # Session Actor
//!
//! Hosts one checkout conversation per buyer.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](keyshop_actor::ActorEntity) implementation for [`Session`]
//! - [`actions`] - [`SessionAction`] and [`SessionActionResult`]
//! - [`error`] - [`SessionError`]
//!
//! ## Flow
//!
//! ```text
//! start ──► AwaitingProduct ──pick_product──► AwaitingDuration ──pick_duration──► AwaitingProof
//!                                                                                    │
//!                                                          submit_proof ──► CheckoutDraft (session dropped)
//! ```
//!
//! A session that sees no accepted step for its ttl is swept away.
//! Starting again under the same buyer replaces the old session.

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::SessionContext;
pub use error::*;

use crate::model::Session;
use keyshop_actor::{ResourceActor, ResourceClient};

pub fn new() -> (ResourceActor<Session>, ResourceClient<Session>) {
    ResourceActor::new(64)
}
