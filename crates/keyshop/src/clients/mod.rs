//! # Clients
//!
//! Typed wrappers around the generic actor clients. Shared `get`/`close`
//! come from [`keyshop_actor::ActorClient`].

pub mod session_client;

pub use keyshop_actor::ActorClient;
pub use session_client::SessionClient;
