use super::rows::ProductRow;
use crate::model::Product;
use crate::store::StoreError;
use sqlx::SqlitePool;

pub(crate) async fn list(pool: &SqlitePool) -> Result<Vec<Product>, StoreError> {
    let rows: Vec<ProductRow> = sqlx::query_as("SELECT id, name, active FROM products ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

pub(crate) async fn upsert(pool: &SqlitePool, product: &Product) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO products (id, name, active) VALUES (?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, active = excluded.active",
    )
    .bind(product.id.as_str())
    .bind(&product.name)
    .bind(product.active)
    .execute(pool)
    .await?;
    Ok(())
}
