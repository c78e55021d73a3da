use chrono::Utc;
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::db_types::{NewProduct, Product, WeightTier};

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    images: Json<Vec<String>>,
    weights: Json<Vec<WeightTier>>,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            images: row.images.0,
            weights: row.weights.0,
            is_active: row.is_active,
        }
    }
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let row: Option<ProductRow> =
        sqlx::query_as("SELECT id, name, images, weights, is_active FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(Product::from))
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let row: ProductRow = sqlx::query_as(
        r#"
            INSERT INTO products (name, images, weights, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, images, weights, is_active;
        "#,
    )
    .bind(product.name)
    .bind(Json(product.images))
    .bind(Json(product.weights))
    .bind(product.is_active)
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

pub async fn update_product_prices(
    product_id: i64,
    weights: &[WeightTier],
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET weights = $1, updated_at = $2 WHERE id = $3")
        .bind(Json(weights))
        .bind(Utc::now())
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_product_active(product_id: i64, active: bool, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET is_active = $1, updated_at = $2 WHERE id = $3")
        .bind(active)
        .bind(Utc::now())
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
