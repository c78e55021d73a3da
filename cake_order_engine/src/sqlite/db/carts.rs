use chrono::Utc;
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::db_types::{Cart, CartItem, Customization, PromoCode, WeightTier};

#[derive(Debug, FromRow)]
struct CartItemRow {
    product_id: i64,
    quantity: i64,
    weight: Json<WeightTier>,
    customizations: Json<Vec<Customization>>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            product_id: row.product_id,
            // The table constrains quantity to 1..=10
            quantity: u32::try_from(row.quantity).unwrap_or_default(),
            weight: row.weight.0,
            customizations: row.customizations.0,
        }
    }
}

pub async fn fetch_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let promo_code: Option<Option<Json<PromoCode>>> =
        sqlx::query_scalar("SELECT promo_code FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    let items: Vec<CartItemRow> = sqlx::query_as(
        r#"
            SELECT product_id, quantity, weight, customizations
            FROM cart_items
            WHERE user_id = $1
            ORDER BY id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    let items = items.into_iter().map(CartItem::from).collect();
    let promo_code = promo_code.flatten().map(|p| p.0);
    Ok(Cart { user_id, items, promo_code })
}

/// Replaces the contents of the cart. This is not atomic on its own. Wrap it in a transaction and pass `&mut *tx`.
pub async fn replace_cart(cart: &Cart, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO carts (user_id, promo_code, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET promo_code = excluded.promo_code, updated_at = excluded.updated_at
        "#,
    )
    .bind(cart.user_id)
    .bind(cart.promo_code.as_ref().map(Json))
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(cart.user_id).execute(&mut *conn).await?;
    for item in &cart.items {
        sqlx::query(
            r#"
                INSERT INTO cart_items (user_id, product_id, quantity, weight, customizations)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(cart.user_id)
        .bind(item.product_id)
        .bind(i64::from(item.quantity))
        .bind(Json(&item.weight))
        .bind(Json(&item.customizations))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&mut *conn).await?;
    sqlx::query("UPDATE carts SET promo_code = NULL, updated_at = $1 WHERE user_id = $2")
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
