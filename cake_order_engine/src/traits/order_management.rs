use thiserror::Error;

use crate::db_types::{GatewayDetails, NewOrder, Order, OrderNumber, OrderStatusType, StatusChange};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order number {0} is already taken")]
    DuplicateOrderNumber(OrderNumber),
    #[error("Coupon {0} has already been used or does not belong to this customer")]
    CouponUnavailable(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait defines the storage contract for orders.
///
/// Every method that changes a contended field (`order_status`, `payment_status`) is a conditional update. When the
/// condition no longer holds, because another request got there first, the methods return `None` rather than
/// overwriting the other request's result.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Returns true if any order, in any state, already uses this order number.
    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, OrderStoreError>;

    /// Stores a new order. In the same atomic transaction:
    /// * if the order carries a promo code, the coupon with that code is marked as used and linked to the new order.
    ///   If the coupon is already used, nothing is stored and [`OrderStoreError::CouponUnavailable`] is returned.
    /// * if `clear_cart` is true, the customer's cart is emptied.
    async fn insert_order(&self, order: NewOrder, clear_cart: bool) -> Result<Order, OrderStoreError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError>;

    /// Fetches the order that was handed the given transaction id when its gateway payment was initiated.
    async fn fetch_order_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Order>, OrderStoreError>;

    /// All orders for the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError>;

    /// The number of orders for the user that have not been cancelled.
    async fn count_active_orders_for_user(&self, user_id: i64) -> Result<i64, OrderStoreError>;

    /// Stores a fresh gateway transaction id on a pending order and resets its payment status to `pending`.
    /// Returns `None` unless the order is pending and either its payment failed or no transaction id is assigned yet.
    async fn assign_gateway_transaction(
        &self,
        order_id: i64,
        transaction_id: &str,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// Moves the order from `from` to `to`, writing the audit fields in `change`. Returns `None` if the order was not
    /// in status `from` at the time of the write.
    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
        change: StatusChange,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// In a single atomic transaction:
    /// * sets `payment_status = paid` and stores the gateway details, but only if the payment is pending or failed,
    /// * advances the order from `pending` to `confirmed` (other fulfilment states are left alone),
    /// * clears the customer's cart, unless the order has been cancelled.
    ///
    /// Returns `None`, with nothing changed, if the payment was not pending or failed.
    async fn mark_order_paid(&self, order_id: i64, details: GatewayDetails) -> Result<Option<Order>, OrderStoreError>;

    /// Sets `payment_status = failed` if it is currently pending or failed. Returns false if nothing was changed.
    async fn mark_payment_failed(&self, order_id: i64) -> Result<bool, OrderStoreError>;

    /// Sets `payment_status = refunded` on a cancelled, paid order. Returns `None` if the order is not in that state.
    async fn mark_payment_refunded(&self, order_id: i64) -> Result<Option<Order>, OrderStoreError>;
}
