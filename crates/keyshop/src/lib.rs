//! # Keyshop
//!
//! Order fulfillment for a shop that sells prepaid access keys. A buyer
//! picks a plan, pays out of band and submits proof; an operator approves
//! or rejects; on approval exactly one unused key from inventory is bound
//! to the order and delivered.
//!
//! ## Layers
//!
//! - [`model`] - credentials, orders, sales, sessions
//! - [`store`] - storage port and its SQLite backend
//! - [`fulfillment`] - allocation engine, lifecycle controller, retry
//! - [`catalog`] - plan table and product cache
//! - [`notify`] - outbound notices
//! - [`session_actor`] / [`clients`] - per-buyer checkout conversation
//! - [`runtime`] - [`KeyShop`](runtime::KeyShop), wiring and shutdown
//!
//! Double allocation is prevented by the store's transaction and the
//! `pending` guard alone, so several shops may share one database.

pub mod catalog;
pub mod clients;
pub mod config;
pub mod error;
pub mod fulfillment;
pub mod model;
pub mod notify;
pub mod runtime;
pub mod session_actor;
pub mod store;

pub use error::DecisionError;
