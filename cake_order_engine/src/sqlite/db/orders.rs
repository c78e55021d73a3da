use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::db_types::{
    DeliveryInfo,
    DeliverySchedule,
    GatewayDetails,
    NewOrder,
    Order,
    OrderItem,
    OrderNumber,
    OrderStatusType,
    PaymentMethod,
    PaymentStatus,
    PromoCode,
    StatusChange,
};
use cake_common::Money;

const ORDER_COLUMNS: &str = r#"
    id,
    order_number,
    user_id,
    items,
    subtotal,
    shipping,
    discount,
    total,
    promo_code,
    payment_method,
    payment_status,
    order_status,
    gateway_transaction_id,
    gateway_details,
    delivery,
    delivery_schedule,
    notes,
    cancelled_at,
    cancel_reason,
    delivered_at,
    created_at,
    updated_at
"#;

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    user_id: i64,
    items: Json<Vec<OrderItem>>,
    subtotal: Money,
    shipping: Money,
    discount: Money,
    total: Money,
    promo_code: Option<Json<PromoCode>>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    order_status: OrderStatusType,
    gateway_transaction_id: Option<String>,
    gateway_details: Option<Json<GatewayDetails>>,
    delivery: Json<DeliveryInfo>,
    delivery_schedule: Json<DeliverySchedule>,
    notes: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: OrderNumber(row.order_number),
            user_id: row.user_id,
            items: row.items.0,
            subtotal: row.subtotal,
            shipping: row.shipping,
            discount: row.discount,
            total: row.total,
            promo_code: row.promo_code.map(|p| p.0),
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            order_status: row.order_status,
            gateway_transaction_id: row.gateway_transaction_id,
            gateway_details: row.gateway_details.map(|d| d.0),
            delivery: row.delivery.0,
            delivery_schedule: row.delivery_schedule.0,
            notes: row.notes,
            cancelled_at: row.cancelled_at,
            cancel_reason: row.cancel_reason,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn order_number_exists(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_number = $1")
        .bind(number.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let payment_status = PaymentStatus::Pending;
    let sql = format!(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                items,
                subtotal,
                shipping,
                discount,
                total,
                promo_code,
                payment_method,
                payment_status,
                order_status,
                delivery,
                delivery_schedule,
                notes,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {ORDER_COLUMNS};
        "#
    );
    let row: OrderRow = sqlx::query_as(&sql)
        .bind(order.order_number.as_str())
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.summary.subtotal)
        .bind(order.summary.shipping)
        .bind(order.summary.discount_amount)
        .bind(order.summary.total)
        .bind(order.promo_code.as_ref().map(Json))
        .bind(order.payment_method)
        .bind(payment_status)
        .bind(order.order_status)
        .bind(Json(&order.delivery))
        .bind(Json(&order.delivery_schedule))
        .bind(order.notes.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await?;
    trace!("🗃️ Order {} inserted with id {}", row.order_number, row.id);
    Ok(row.into())
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql).bind(number.as_str()).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

pub async fn fetch_order_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_transaction_id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql).bind(transaction_id).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
    let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(user_id).fetch_all(conn).await?;
    Ok(rows.into_iter().map(Order::from).collect())
}

pub async fn count_active_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1 AND order_status != $2")
        .bind(user_id)
        .bind(OrderStatusType::Cancelled)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn assign_gateway_transaction(
    order_id: i64,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET gateway_transaction_id = $1, payment_status = 'pending', updated_at = $2
            WHERE id = $3 AND order_status = 'pending' AND
                (payment_status = 'failed' OR (payment_status = 'pending' AND gateway_transaction_id IS NULL))
        "#,
    )
    .bind(transaction_id)
    .bind(Utc::now())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Compare-and-swap on `order_status`. Returns false if the order was not in status `from`.
pub async fn update_order_status(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    change: StatusChange,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                order_status = $1,
                cancelled_at = COALESCE($2, cancelled_at),
                cancel_reason = COALESCE($3, cancel_reason),
                delivered_at = COALESCE($4, delivered_at),
                notes = COALESCE($5, notes),
                payment_status = COALESCE($6, payment_status),
                updated_at = $7
            WHERE id = $8 AND order_status = $9
        "#,
    )
    .bind(to)
    .bind(change.cancelled_at)
    .bind(change.cancel_reason)
    .bind(change.delivered_at)
    .bind(change.notes)
    .bind(change.payment_status)
    .bind(Utc::now())
    .bind(order_id)
    .bind(from)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Marks the payment as paid and advances a pending order to confirmed. Returns false if the payment was not pending
/// or failed, in which case nothing is changed.
pub async fn mark_order_paid(
    order_id: i64,
    details: &GatewayDetails,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                payment_status = 'paid',
                gateway_details = $1,
                order_status = CASE WHEN order_status = 'pending' THEN 'confirmed' ELSE order_status END,
                updated_at = $2
            WHERE id = $3 AND payment_status IN ('pending', 'failed')
        "#,
    )
    .bind(Json(details))
    .bind(Utc::now())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_payment_failed(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET payment_status = 'failed', updated_at = $1
            WHERE id = $2 AND payment_status IN ('pending', 'failed')
        "#,
    )
    .bind(Utc::now())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_payment_refunded(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET payment_status = 'refunded', updated_at = $1
            WHERE id = $2 AND order_status = 'cancelled' AND payment_status = 'paid'
        "#,
    )
    .bind(Utc::now())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
