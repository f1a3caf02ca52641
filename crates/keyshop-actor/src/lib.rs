//! # Keyed Actor Runtime
//!
//! Small building blocks for hosting short-lived, keyed state behind a
//! message-passing actor: one [`ResourceActor`] per entity type, talked to
//! through a cloneable [`ResourceClient`].
//!
//! ## Layers
//!
//! 1. **Entity** ([`ActorEntity`]) - the state and its transitions.
//! 2. **Runtime** ([`ResourceActor`]) - sequential request processing, expiry sweeps.
//! 3. **Interface** ([`ResourceClient`], [`ActorClient`]) - typed requests over channels.
//!
//! Entities are addressed by a caller-supplied key (see [`ActorEntity::key`]).
//! Opening under a live key replaces the previous entity. An entity is
//! dropped when it is closed, when an action leaves it finished, or when its
//! deadline passes.
//!
//! ## Context Injection
//!
//! Dependencies are passed to [`ResourceActor::run`] rather than to the
//! constructor, so a client can be handed out before the services the entity
//! needs exist.
//!
//! ## Testing
//!
//! The [`mock`] module scripts replies for a [`ResourceClient`] without a
//! running actor.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
