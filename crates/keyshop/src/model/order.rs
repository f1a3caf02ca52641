//! Orders and the decisions that close them.

use crate::model::{BuyerId, Days, OperatorId, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Longest free-text rejection reason that is kept.
pub const MAX_REASON_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// `Pending` is the only state that can change; the other two are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Why an operator turned an order down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    NoPayment,
    WrongAmount,
    InvalidProof,
    Timeout,
    Other(String),
}

impl RejectReason {
    /// Free-text reason, trimmed and capped at [`MAX_REASON_CHARS`].
    pub fn other(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return RejectReason::Other("Rejected".to_string());
        }
        RejectReason::Other(trimmed.chars().take(MAX_REASON_CHARS).collect())
    }

    /// Maps a preset code (`no_payment`, ...) to its variant; anything else
    /// is kept as free text.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "no_payment" => RejectReason::NoPayment,
            "wrong_amount" => RejectReason::WrongAmount,
            "invalid_proof" => RejectReason::InvalidProof,
            "timeout" => RejectReason::Timeout,
            text => RejectReason::other(text),
        }
    }

    /// Stored form: the preset code, or the free text itself.
    pub fn code(&self) -> &str {
        match self {
            RejectReason::NoPayment => "no_payment",
            RejectReason::WrongAmount => "wrong_amount",
            RejectReason::InvalidProof => "invalid_proof",
            RejectReason::Timeout => "timeout",
            RejectReason::Other(text) => text,
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            RejectReason::NoPayment => "No payment found",
            RejectReason::WrongAmount => "Wrong amount",
            RejectReason::InvalidProof => "Invalid proof",
            RejectReason::Timeout => "Timeout",
            RejectReason::Other(text) => text,
        }
    }
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// What an operator decided for a pending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject(RejectReason),
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject(_) => "reject",
        }
    }
}

/// One purchase attempt.
///
/// `credential` is set exactly when `status` is `Approved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer: BuyerId,
    pub buyer_name: String,
    pub product: ProductId,
    pub duration: Days,
    pub amount: i64,
    pub status: OrderStatus,
    pub credential: Option<String>,
    /// Opaque reference to the payment proof the buyer submitted.
    pub proof: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<OperatorId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<OperatorId>,
    pub reject_reason: Option<RejectReason>,
}

impl Order {
    /// Last day the delivered key is valid, counted from approval.
    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.approved_at
            .map(|at| at + chrono::Duration::days(i64::from(self.duration.0)))
    }
}

/// Payload for creating a pending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreate {
    pub buyer: BuyerId,
    pub buyer_name: String,
    pub product: ProductId,
    pub duration: Days,
    pub amount: i64,
    pub proof: Option<String>,
}
