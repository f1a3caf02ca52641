//! Steps a buyer takes through checkout, as actions on a
//! [`Session`](crate::model::Session).

use crate::catalog::Plan;
use crate::model::{CheckoutDraft, Days, ProductId};

#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Allowed while picking a product or a duration (changing one's mind).
    PickProduct(ProductId),
    PickDuration(Days),
    /// Ends the session.
    SubmitProof(String),
}

/// Price to pay and the stock snapshot it was offered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub amount: i64,
    pub available: u64,
}

/// Variants match 1:1 with [`SessionAction`].
#[derive(Debug, Clone)]
pub enum SessionActionResult {
    PickProduct(Vec<Plan>),
    PickDuration(Quote),
    SubmitProof(CheckoutDraft),
}
