//! Credential inventory outside the allocation transaction.

use super::rows::{days_param, to_millis, CredentialRow};
use crate::model::{Credential, Days, InventoryCount, NewCredential, ProductId, RemoveOutcome};
use crate::store::StoreError;
use chrono::Utc;
use sqlx::SqlitePool;

pub(crate) async fn count_available(
    pool: &SqlitePool,
    product: &ProductId,
    duration: Days,
) -> Result<u64, StoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM credentials WHERE product_id = ? AND duration_days = ? AND consumed = 0",
    )
    .bind(product.as_str())
    .bind(days_param(duration))
    .fetch_one(pool)
    .await?;
    Ok(u64::try_from(count).unwrap_or_default())
}

pub(crate) async fn insert(pool: &SqlitePool, new: NewCredential) -> Result<Credential, StoreError> {
    let row: CredentialRow = sqlx::query_as(
        "INSERT INTO credentials (product_id, duration_days, value, created_at) VALUES (?, ?, ?, ?) \
         RETURNING id, product_id, duration_days, value, consumed, created_at, consumed_at, order_id",
    )
    .bind(new.product.as_str())
    .bind(days_param(new.duration))
    .bind(&new.value)
    .bind(to_millis(Utc::now()))
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateCredentialValue
        }
        _ => StoreError::from(e),
    })?;
    Credential::try_from(row)
}

pub(crate) async fn delete_if_available(
    pool: &SqlitePool,
    product: &ProductId,
    duration: Days,
    value: &str,
) -> Result<RemoveOutcome, StoreError> {
    let result = sqlx::query(
        "DELETE FROM credentials WHERE product_id = ? AND duration_days = ? AND value = ? AND consumed = 0",
    )
    .bind(product.as_str())
    .bind(days_param(duration))
    .bind(value)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() == 1 {
        RemoveOutcome::Removed
    } else {
        RemoveOutcome::NotFoundOrConsumed
    })
}

pub(crate) async fn by_value(
    pool: &SqlitePool,
    value: &str,
) -> Result<Option<Credential>, StoreError> {
    let row: Option<CredentialRow> = sqlx::query_as(
        "SELECT id, product_id, duration_days, value, consumed, created_at, consumed_at, order_id \
         FROM credentials WHERE value = ?",
    )
    .bind(value)
    .fetch_optional(pool)
    .await?;
    row.map(Credential::try_from).transpose()
}

pub(crate) async fn summary(pool: &SqlitePool) -> Result<Vec<InventoryCount>, StoreError> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT product_id, duration_days, COUNT(*) FROM credentials WHERE consumed = 0 \
         GROUP BY product_id, duration_days ORDER BY product_id, duration_days",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(product, duration, available)| {
            let duration = u32::try_from(duration)
                .map_err(|_| StoreError::Corrupt(format!("duration_days out of range: {duration}")))?;
            Ok(InventoryCount {
                product: ProductId(product),
                duration: Days(duration),
                available: u64::try_from(available).unwrap_or_default(),
            })
        })
        .collect()
}
