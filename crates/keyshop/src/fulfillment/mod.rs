//! # Fulfillment
//!
//! The part of the shop that protects inventory: the allocation engine, the
//! order lifecycle controller in front of it, and the retry wrapper both
//! share.
//!
//! ```text
//! submit_decision ──► OperatorGate ──► RetryPolicy ──► AllocationEngine::approve
//!                                          │
//!                                          └─────────► reject (same guard, no inventory)
//! ```

pub mod allocation;
pub mod lifecycle;
pub mod retry;

pub use allocation::{Allocation, AllocationEngine, AllocationError};
pub use lifecycle::{AllowList, DecisionOutcome, OperatorGate, OrderLifecycle};
pub use retry::RetryPolicy;
