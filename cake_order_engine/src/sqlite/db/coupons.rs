use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{Coupon, NewCoupon};

pub(crate) const COUPON_COLUMNS: &str = r#"
    id,
    user_id,
    code,
    discount_type,
    discount_value,
    max_discount,
    min_order_amount,
    reward_tier_id,
    reward_name,
    points_cost,
    is_used,
    used_at,
    used_in_order,
    expires_at,
    created_at
"#;

pub async fn insert_coupon(coupon: &NewCoupon, conn: &mut SqliteConnection) -> Result<Coupon, sqlx::Error> {
    let sql = format!(
        r#"
            INSERT INTO coupons (
                user_id,
                code,
                discount_type,
                discount_value,
                max_discount,
                min_order_amount,
                reward_tier_id,
                reward_name,
                points_cost,
                expires_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COUPON_COLUMNS};
        "#
    );
    let coupon: Coupon = sqlx::query_as(&sql)
        .bind(coupon.user_id)
        .bind(coupon.code.as_str())
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.max_discount)
        .bind(coupon.min_order_amount)
        .bind(coupon.reward_tier_id.as_str())
        .bind(coupon.reward_name.as_str())
        .bind(coupon.points_cost)
        .bind(coupon.expires_at)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;
    Ok(coupon)
}

pub async fn fetch_coupon_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1");
    let coupon: Option<Coupon> = sqlx::query_as(&sql).bind(code).fetch_optional(conn).await?;
    Ok(coupon)
}

pub async fn fetch_coupons_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Coupon>, sqlx::Error> {
    let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE user_id = $1 ORDER BY id DESC");
    let coupons: Vec<Coupon> = sqlx::query_as(&sql).bind(user_id).fetch_all(conn).await?;
    Ok(coupons)
}

pub async fn coupon_code_exists(code: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM coupons WHERE code = $1").bind(code).fetch_one(conn).await?;
    Ok(count > 0)
}

/// Marks the coupon as used by the given order. This is a compare-and-swap on `is_used`, so a coupon can only ever be
/// consumed once. Returns false if the coupon is already used, or does not belong to `user_id`.
pub async fn consume_coupon(
    code: &str,
    user_id: i64,
    order_id: i64,
    used_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE coupons SET is_used = 1, used_at = $1, used_in_order = $2
            WHERE code = $3 AND user_id = $4 AND is_used = 0
        "#,
    )
    .bind(used_at)
    .bind(order_id)
    .bind(code)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

