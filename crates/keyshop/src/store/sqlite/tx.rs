//! The decision transaction.
//!
//! Opened with `BEGIN IMMEDIATE`, so the connection holds the database
//! write lock before its first read. A second decision waits on the busy
//! timeout and, once it gets in, sees everything the first one committed.

use super::orders;
use super::rows::{days_param, to_millis, CredentialRow, SaleRow};
use crate::model::{Credential, Days, OperatorId, Order, OrderId, ProductId, RejectReason, SaleRecord};
use crate::store::{FulfillmentTx, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTx {
    pub(crate) async fn begin(pool: &SqlitePool) -> Result<Self, StoreError> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Self { tx })
    }
}

#[async_trait]
impl FulfillmentTx for SqliteTx {
    async fn load_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        orders::fetch(&mut *self.tx, id).await
    }

    async fn claim_oldest_available(
        &mut self,
        product: &ProductId,
        duration: Days,
        order: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<Credential>, StoreError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            "UPDATE credentials SET consumed = 1, consumed_at = ?, order_id = ? \
             WHERE id = ( \
                 SELECT id FROM credentials \
                 WHERE product_id = ? AND duration_days = ? AND consumed = 0 \
                 ORDER BY created_at, id LIMIT 1 \
             ) AND consumed = 0 \
             RETURNING id, product_id, duration_days, value, consumed, created_at, consumed_at, order_id",
        )
        .bind(to_millis(at))
        .bind(order.to_string())
        .bind(product.as_str())
        .bind(days_param(duration))
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Credential::try_from).transpose()
    }

    async fn mark_approved(
        &mut self,
        id: OrderId,
        credential: &str,
        operator: OperatorId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'approved', credential = ?, approved_at = ?, approved_by = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(credential)
        .bind(to_millis(at))
        .bind(operator.0)
        .bind(id.to_string())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_rejected(
        &mut self,
        id: OrderId,
        operator: OperatorId,
        reason: &RejectReason,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'rejected', rejected_at = ?, rejected_by = ?, reject_reason = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(to_millis(at))
        .bind(operator.0)
        .bind(reason.code())
        .bind(id.to_string())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn append_sale(
        &mut self,
        order: &Order,
        credential: &str,
        at: DateTime<Utc>,
    ) -> Result<SaleRecord, StoreError> {
        let row: SaleRow = sqlx::query_as(
            "INSERT INTO sales (order_id, buyer_id, buyer_name, product_id, duration_days, amount, credential, sold_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id, order_id, buyer_id, buyer_name, product_id, duration_days, amount, credential, sold_at",
        )
        .bind(order.id.to_string())
        .bind(order.buyer.0)
        .bind(&order.buyer_name)
        .bind(order.product.as_str())
        .bind(days_param(order.duration))
        .bind(order.amount)
        .bind(credential)
        .bind(to_millis(at))
        .fetch_one(&mut *self.tx)
        .await?;
        SaleRecord::try_from(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
