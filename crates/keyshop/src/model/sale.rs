use crate::model::{BuyerId, Days, OrderId, ProductId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Append-only audit row written in the same transaction as an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer: BuyerId,
    pub buyer_name: String,
    pub product: ProductId,
    pub duration: Days,
    pub amount: i64,
    pub credential: String,
    pub sold_at: DateTime<Utc>,
}
