use crate::model::{Days, OrderId, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub i64);

impl Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential_{}", self.0)
    }
}

/// One sellable access code.
///
/// `value` is unique across the whole inventory. Once `consumed` is set it
/// never goes back, and `order_id` names the order it was allocated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub product: ProductId,
    pub duration: Days,
    pub value: String,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub order_id: Option<OrderId>,
}

/// Payload for adding a credential to inventory.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub product: ProductId,
    pub duration: Days,
    pub value: String,
}

impl NewCredential {
    pub fn new(product: impl Into<ProductId>, duration: u32, value: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            duration: Days(duration),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// No credential with that value, or it has already been sold.
    NotFoundOrConsumed,
}

/// Available credentials for one plan, for operator display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryCount {
    pub product: ProductId,
    pub duration: Days,
    pub available: u64,
}
