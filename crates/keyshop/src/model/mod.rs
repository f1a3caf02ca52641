//! # Domain Model
//!
//! Plain data shared by every layer: credentials and orders as they are
//! stored, the sales ledger, and the conversation session record.

pub mod credential;
pub mod order;
pub mod party;
pub mod product;
pub mod sale;
pub mod session;

pub use credential::*;
pub use order::*;
pub use party::*;
pub use product::*;
pub use sale::*;
pub use session::*;
