use super::rows::{collect, days_param, to_millis, OrderRow};
use crate::model::{BuyerId, Order, OrderCreate, OrderId, OrderStatus};
use crate::store::StoreError;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

pub(crate) async fn create(pool: &SqlitePool, params: OrderCreate) -> Result<Order, StoreError> {
    let row: OrderRow = sqlx::query_as(
        "INSERT INTO orders (id, buyer_id, buyer_name, product_id, duration_days, amount, proof, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id, buyer_id, buyer_name, product_id, duration_days, amount, status, credential, \
         proof, created_at, approved_at, approved_by, rejected_at, rejected_by, reject_reason",
    )
    .bind(OrderId::new().to_string())
    .bind(params.buyer.0)
    .bind(&params.buyer_name)
    .bind(params.product.as_str())
    .bind(days_param(params.duration))
    .bind(params.amount)
    .bind(&params.proof)
    .bind(to_millis(Utc::now()))
    .fetch_one(pool)
    .await?;
    Order::try_from(row)
}

/// Works against the pool or inside a transaction.
pub(crate) async fn fetch<'e, E>(exec: E, id: OrderId) -> Result<Option<Order>, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<OrderRow> = sqlx::query_as(
        "SELECT id, buyer_id, buyer_name, product_id, duration_days, amount, status, credential, \
         proof, created_at, approved_at, approved_by, rejected_at, rejected_by, reject_reason \
         FROM orders WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await?;
    row.map(Order::try_from).transpose()
}

const ORDER_COLUMNS: &str = "id, buyer_id, buyer_name, product_id, duration_days, amount, status, credential, \
     proof, created_at, approved_at, approved_by, rejected_at, rejected_by, reject_reason";

pub(crate) async fn list_recent(
    pool: &SqlitePool,
    limit: u32,
    offset: u32,
) -> Result<Vec<Order>, StoreError> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(pool)
    .await?;
    collect(rows)
}

pub(crate) async fn list_by_status(
    pool: &SqlitePool,
    status: OrderStatus,
    limit: u32,
    offset: u32,
) -> Result<Vec<Order>, StoreError> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? \
         ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(status.as_str())
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(pool)
    .await?;
    collect(rows)
}

pub(crate) async fn list_by_buyer(
    pool: &SqlitePool,
    buyer: BuyerId,
    limit: u32,
) -> Result<Vec<Order>, StoreError> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = ? \
         ORDER BY created_at DESC, rowid DESC LIMIT ?"
    ))
    .bind(buyer.0)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;
    collect(rows)
}
