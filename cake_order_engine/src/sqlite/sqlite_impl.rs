//! `SqliteDatabase` is a concrete implementation of a cake order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{
    db::{carts, coupons, db_url, is_unique_violation, new_pool, orders, points, products, users},
    SqliteDatabaseError,
};
use crate::{
    db_types::{
        Cart,
        Coupon,
        GatewayDetails,
        NewCoupon,
        NewOrder,
        NewPointsEntry,
        NewProduct,
        NewUser,
        Order,
        OrderNumber,
        OrderStatusType,
        PointsEntry,
        PointsEntryType,
        Product,
        StatusChange,
        User,
        WeightTier,
    },
    traits::{
        CartManagement,
        CartStoreError,
        CatalogError,
        CatalogLookup,
        LoyaltyManagement,
        LoyaltyStoreError,
        OrderManagement,
        OrderStoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CatalogLookup for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, user_id: i64) -> Result<Cart, CartStoreError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_cart(user_id, &mut conn).await?;
        Ok(cart)
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), CartStoreError> {
        let mut tx = self.pool.begin().await?;
        carts::replace_cart(cart, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Cart for user #{} saved with {} lines", cart.user_id, cart.items.len());
        Ok(())
    }

    async fn clear_cart(&self, user_id: i64) -> Result<(), CartStoreError> {
        let mut tx = self.pool.begin().await?;
        carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Cart for user #{user_id} cleared");
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let exists = orders::order_number_exists(number, &mut conn).await?;
        Ok(exists)
    }

    async fn insert_order(&self, order: NewOrder, clear_cart: bool) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = match orders::insert_order(&order, &mut tx).await {
            Ok(o) => o,
            Err(e) if is_unique_violation(&e) => return Err(OrderStoreError::DuplicateOrderNumber(order.order_number)),
            Err(e) => return Err(e.into()),
        };
        if let Some(code) = order.coupon_code() {
            let consumed = coupons::consume_coupon(code, order.user_id, inserted.id, Utc::now(), &mut tx).await?;
            if !consumed {
                // Dropping the transaction rolls back the order insert
                return Err(OrderStoreError::CouponUnavailable(code.to_string()));
            }
            trace!("🗃️ Coupon {code} consumed by order #{}", inserted.id);
        }
        if clear_cart {
            carts::clear_cart(order.user_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", inserted.order_number, inserted.id);
        Ok(inserted)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_transaction_id(transaction_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn count_active_orders_for_user(&self, user_id: i64) -> Result<i64, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = orders::count_active_orders_for_user(user_id, &mut conn).await?;
        Ok(count)
    }

    async fn assign_gateway_transaction(
        &self,
        order_id: i64,
        transaction_id: &str,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::assign_gateway_transaction(order_id, transaction_id, &mut tx).await? {
            return Ok(None);
        }
        let order = orders::fetch_order_by_id(order_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order #{order_id} linked to gateway transaction {transaction_id}");
        Ok(order)
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
        change: StatusChange,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::update_order_status(order_id, from, to, change, &mut tx).await? {
            trace!("🗃️ Order #{order_id} was not {from} when trying to move it to {to}");
            return Ok(None);
        }
        let order = orders::fetch_order_by_id(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn mark_order_paid(&self, order_id: i64, details: GatewayDetails) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::mark_order_paid(order_id, &details, &mut tx).await? {
            return Ok(None);
        }
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or(OrderStoreError::OrderNotFound(order_id))?;
        // A cancelled order stays cancelled, and the cart belongs to whatever the customer is shopping for now
        if order.order_status != OrderStatusType::Cancelled {
            carts::clear_cart(order.user_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} marked as paid. Transaction {}", details.transaction_id);
        Ok(Some(order))
    }

    async fn mark_payment_failed(&self, order_id: i64) -> Result<bool, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = orders::mark_payment_failed(order_id, &mut conn).await?;
        Ok(updated)
    }

    async fn mark_payment_refunded(&self, order_id: i64) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::mark_payment_refunded(order_id, &mut tx).await? {
            return Ok(None);
        }
        let order = orders::fetch_order_by_id(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }
}

impl LoyaltyManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, LoyaltyStoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_points_history(&self, user_id: i64) -> Result<Vec<PointsEntry>, LoyaltyStoreError> {
        let mut conn = self.pool.acquire().await?;
        let history = points::fetch_history(user_id, &mut conn).await?;
        Ok(history)
    }

    async fn credit_points(&self, entry: NewPointsEntry) -> Result<i64, LoyaltyStoreError> {
        let mut tx = self.pool.begin().await?;
        let balance = users::adjust_points(entry.user_id, entry.amount, &mut tx)
            .await?
            .ok_or(LoyaltyStoreError::UserNotFound(entry.user_id))?;
        match points::insert_entry(&entry, None, &mut tx).await {
            Ok(_) => {},
            Err(e) if is_unique_violation(&e) && entry.entry_type == PointsEntryType::Earned => {
                return Err(LoyaltyStoreError::AlreadyAwarded(entry.order_id.unwrap_or_default()));
            },
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        debug!("🗃️ {} points credited to user #{}. New balance: {balance}", entry.amount, entry.user_id);
        Ok(balance)
    }

    async fn redeem_points_for_coupon(
        &self,
        coupon: NewCoupon,
        description: &str,
    ) -> Result<Coupon, LoyaltyStoreError> {
        let mut tx = self.pool.begin().await?;
        let user_id = coupon.user_id;
        let cost = coupon.points_cost;
        let balance = match users::deduct_points_if_sufficient(user_id, cost, &mut tx).await? {
            Some(b) => b,
            None => {
                let available =
                    users::fetch_balance(user_id, &mut tx).await?.ok_or(LoyaltyStoreError::UserNotFound(user_id))?;
                return Err(LoyaltyStoreError::InsufficientPoints { required: cost, available });
            },
        };
        let inserted = match coupons::insert_coupon(&coupon, &mut tx).await {
            Ok(c) => c,
            Err(e) if is_unique_violation(&e) => return Err(LoyaltyStoreError::DuplicateCouponCode(coupon.code)),
            Err(e) => return Err(e.into()),
        };
        let entry = NewPointsEntry {
            user_id,
            amount: -cost,
            entry_type: PointsEntryType::Redeemed,
            description: description.to_string(),
            order_id: None,
        };
        points::insert_entry(&entry, Some(inserted.id), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User #{user_id} exchanged {cost} points for coupon {}. New balance: {balance}", inserted.code);
        Ok(inserted)
    }

    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, LoyaltyStoreError> {
        let mut conn = self.pool.acquire().await?;
        let coupon = coupons::fetch_coupon_by_code(code, &mut conn).await?;
        Ok(coupon)
    }

    async fn fetch_coupons_for_user(&self, user_id: i64) -> Result<Vec<Coupon>, LoyaltyStoreError> {
        let mut conn = self.pool.acquire().await?;
        let coupons = coupons::fetch_coupons_for_user(user_id, &mut conn).await?;
        Ok(coupons)
    }

    async fn coupon_code_exists(&self, code: &str) -> Result<bool, LoyaltyStoreError> {
        let mut conn = self.pool.acquire().await?;
        let exists = coupons::coupon_code_exists(code, &mut conn).await?;
        Ok(exists)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `CAKE_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let email = user.email.clone();
        let user = match users::insert_user(user, &mut tx).await {
            Ok(u) => u,
            Err(e) if is_unique_violation(&e) => return Err(SqliteDatabaseError::DuplicateUser(email)),
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;
        debug!("🗃️ Created user #{} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Created product #{} ({})", product.id, product.name);
        Ok(product)
    }

    /// Replaces the weight tiers (and hence prices) of a product. Carts keep the price they were given; orders are
    /// never affected.
    pub async fn update_product_prices(&self, product_id: i64, weights: &[WeightTier]) -> Result<(), SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        if !products::update_product_prices(product_id, weights, &mut conn).await? {
            return Err(SqliteDatabaseError::ProductNotFound(product_id));
        }
        Ok(())
    }

    pub async fn set_product_active(&self, product_id: i64, active: bool) -> Result<(), SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        if !products::set_product_active(product_id, active, &mut conn).await? {
            return Err(SqliteDatabaseError::ProductNotFound(product_id));
        }
        debug!("🗃️ Product #{product_id} active: {active}");
        Ok(())
    }
}
