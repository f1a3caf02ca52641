use super::rows::{collect, SaleRow};
use crate::model::{OrderId, SaleRecord};
use crate::store::StoreError;
use sqlx::SqlitePool;

pub(crate) async fn recent(pool: &SqlitePool, limit: u32) -> Result<Vec<SaleRecord>, StoreError> {
    let rows: Vec<SaleRow> = sqlx::query_as(
        "SELECT id, order_id, buyer_id, buyer_name, product_id, duration_days, amount, credential, sold_at \
         FROM sales ORDER BY sold_at DESC, id DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;
    collect(rows)
}

pub(crate) async fn for_order(
    pool: &SqlitePool,
    id: OrderId,
) -> Result<Option<SaleRecord>, StoreError> {
    let row: Option<SaleRow> = sqlx::query_as(
        "SELECT id, order_id, buyer_id, buyer_name, product_id, duration_days, amount, credential, sold_at \
         FROM sales WHERE order_id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.map(SaleRecord::try_from).transpose()
}
