//! # ActorEntity Trait
//!
//! The contract a keyed, short-lived resource must satisfy to be hosted by a
//! [`ResourceActor`](crate::ResourceActor).
//!
//! Unlike a classic CRUD store, entities here are addressed by a key the
//! caller already owns (a buyer id, a chat id, ...). Opening an entity under
//! a key that is already live replaces the old one, which is how a
//! conversation is restarted.
//!
//! # Lifetime
//! An entity leaves the actor in one of three ways:
//! - the caller closes it explicitly,
//! - an action leaves it [`finished`](ActorEntity::is_finished),
//! - its [`expires_at`](ActorEntity::expires_at) deadline passes.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use tokio::time::Instant;

#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// Key the entity is stored under.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// Payload that opens a new entity.
    type Create: Send + Sync + Debug;

    /// Resource-specific operations (one enum per entity).
    type Action: Send + Sync + Debug;

    /// Result returned by [`handle_action`](ActorEntity::handle_action).
    type ActionResult: Send + Sync + Debug;

    /// Runtime dependencies injected into every hook. Use `()` if none.
    type Context: Send + Sync;

    /// One error enum per entity, covering every action.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The key a create payload will be stored under.
    fn key(params: &Self::Create) -> Self::Id;

    /// Builds the entity. Called before [`on_create`](ActorEntity::on_create).
    fn from_create_params(params: Self::Create) -> Result<Self, Self::Error>;

    /// Runs after construction, before the entity becomes visible.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles one action. A failed action leaves the entity in place.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;

    /// `true` once the entity has nothing left to do; the actor drops it
    /// right after the action that finished it.
    fn is_finished(&self) -> bool {
        false
    }

    /// Deadline after which the entity is treated as gone.
    fn expires_at(&self) -> Option<Instant> {
        None
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|deadline| deadline <= now)
    }
}
