use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewUser, User};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (name, email, created_at) VALUES ($1, $2, $3)
            RETURNING id, name, email, sweet_points, created_at;
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user: Option<User> =
        sqlx::query_as("SELECT id, name, email, sweet_points, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(user)
}

pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let balance = sqlx::query_scalar("SELECT sweet_points FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance)
}

/// Adds `amount` (which may be negative) to the user's balance and returns the new balance. Returns `None` if the user
/// does not exist. The `sweet_points >= 0` table constraint rejects overdrafts.
pub async fn adjust_points(user_id: i64, amount: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let balance = sqlx::query_scalar(
        "UPDATE users SET sweet_points = sweet_points + $1 WHERE id = $2 RETURNING sweet_points",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}

/// Decrements the balance by `cost` only if the balance covers it. Returns the new balance, or `None` if the user does
/// not exist or has too few points.
pub async fn deduct_points_if_sufficient(
    user_id: i64,
    cost: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let balance = sqlx::query_scalar(
        r#"
            UPDATE users SET sweet_points = sweet_points - $1
            WHERE id = $2 AND sweet_points >= $3
            RETURNING sweet_points
        "#,
    )
    .bind(cost)
    .bind(user_id)
    .bind(cost)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}
