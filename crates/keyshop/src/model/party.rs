use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Chat-level identifier of the person buying a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuyerId(pub i64);

impl Display for BuyerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buyer_{}", self.0)
    }
}

/// Chat-level identifier of a person allowed to decide orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub i64);

impl Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operator_{}", self.0)
    }
}

/// Who a notice is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    Buyer(BuyerId),
    Operator(OperatorId),
}

impl Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::Buyer(id) => id.fmt(f),
            Recipient::Operator(id) => id.fmt(f),
        }
    }
}
