use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewPointsEntry, PointsEntry};

pub async fn insert_entry(
    entry: &NewPointsEntry,
    coupon_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<PointsEntry, sqlx::Error> {
    let entry: PointsEntry = sqlx::query_as(
        r#"
            INSERT INTO points_history (user_id, amount, entry_type, description, order_id, coupon_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, amount, entry_type, description, order_id, coupon_id, created_at;
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.amount)
    .bind(entry.entry_type)
    .bind(entry.description.as_str())
    .bind(entry.order_id)
    .bind(coupon_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_history(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PointsEntry>, sqlx::Error> {
    let entries: Vec<PointsEntry> = sqlx::query_as(
        r#"
            SELECT id, user_id, amount, entry_type, description, order_id, coupon_id, created_at
            FROM points_history
            WHERE user_id = $1
            ORDER BY id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
