//! Raw table rows and their conversion into domain types.
//!
//! Timestamps are stored as UTC milliseconds, order ids as UUID text.

use crate::model::{
    BuyerId, Credential, CredentialId, Days, OperatorId, Order, OrderId, Product, ProductId,
    RejectReason, SaleRecord,
};
use crate::store::StoreError;
use chrono::{DateTime, Utc};

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("{column} out of range: {ms}")))
}

fn from_millis_opt(ms: Option<i64>, column: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    ms.map(|ms| from_millis(ms, column)).transpose()
}

fn days(raw: i64) -> Result<Days, StoreError> {
    u32::try_from(raw)
        .map(Days)
        .map_err(|_| StoreError::Corrupt(format!("duration_days out of range: {raw}")))
}

pub(crate) fn days_param(duration: Days) -> i64 {
    i64::from(duration.0)
}

fn order_id(raw: &str) -> Result<OrderId, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("bad order id {raw:?}: {e}")))
}

#[derive(sqlx::FromRow)]
pub(crate) struct CredentialRow {
    id: i64,
    product_id: String,
    duration_days: i64,
    value: String,
    consumed: bool,
    created_at: i64,
    consumed_at: Option<i64>,
    order_id: Option<String>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = StoreError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(Credential {
            id: CredentialId(row.id),
            product: ProductId(row.product_id),
            duration: days(row.duration_days)?,
            value: row.value,
            consumed: row.consumed,
            created_at: from_millis(row.created_at, "created_at")?,
            consumed_at: from_millis_opt(row.consumed_at, "consumed_at")?,
            order_id: row.order_id.as_deref().map(order_id).transpose()?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct OrderRow {
    id: String,
    buyer_id: i64,
    buyer_name: String,
    product_id: String,
    duration_days: i64,
    amount: i64,
    status: String,
    credential: Option<String>,
    proof: Option<String>,
    created_at: i64,
    approved_at: Option<i64>,
    approved_by: Option<i64>,
    rejected_at: Option<i64>,
    rejected_by: Option<i64>,
    reject_reason: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", row.id)))?;
        Ok(Order {
            id: order_id(&row.id)?,
            buyer: BuyerId(row.buyer_id),
            buyer_name: row.buyer_name,
            product: ProductId(row.product_id),
            duration: days(row.duration_days)?,
            amount: row.amount,
            status,
            credential: row.credential,
            proof: row.proof,
            created_at: from_millis(row.created_at, "created_at")?,
            approved_at: from_millis_opt(row.approved_at, "approved_at")?,
            approved_by: row.approved_by.map(OperatorId),
            rejected_at: from_millis_opt(row.rejected_at, "rejected_at")?,
            rejected_by: row.rejected_by.map(OperatorId),
            reject_reason: row.reject_reason.as_deref().map(RejectReason::from_code),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SaleRow {
    id: i64,
    order_id: String,
    buyer_id: i64,
    buyer_name: String,
    product_id: String,
    duration_days: i64,
    amount: i64,
    credential: String,
    sold_at: i64,
}

impl TryFrom<SaleRow> for SaleRecord {
    type Error = StoreError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(SaleRecord {
            id: row.id,
            order_id: order_id(&row.order_id)?,
            buyer: BuyerId(row.buyer_id),
            buyer_name: row.buyer_name,
            product: ProductId(row.product_id),
            duration: days(row.duration_days)?,
            amount: row.amount,
            credential: row.credential,
            sold_at: from_millis(row.sold_at, "sold_at")?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    name: String,
    active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId(row.id),
            name: row.name,
            active: row.active,
        }
    }
}

/// Converts every row, failing on the first corrupt one.
pub(crate) fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
