//! Runtime orchestration.
//!
//! - [`KeyShop`] - wires the store, catalog, decision path, notification
//!   dispatcher and session actor together, and shuts them down
//! - [`setup_tracing`] - installs the log subscriber

pub mod shop;
pub mod tracing;

pub use self::shop::{KeyShop, ShopError};
pub use self::tracing::setup_tracing;
