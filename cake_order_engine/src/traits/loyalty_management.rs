use thiserror::Error;

use crate::db_types::{Coupon, NewCoupon, NewPointsEntry, PointsEntry, User};

#[derive(Debug, Clone, Error)]
pub enum LoyaltyStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Points for order #{0} have already been awarded")]
    AlreadyAwarded(i64),
    #[error("Not enough points. Required {required}, but only {available} are available")]
    InsufficientPoints { required: i64, available: i64 },
    #[error("Coupon code {0} is already taken")]
    DuplicateCouponCode(String),
}

impl From<sqlx::Error> for LoyaltyStoreError {
    fn from(e: sqlx::Error) -> Self {
        LoyaltyStoreError::DatabaseError(e.to_string())
    }
}

/// Storage for the points ledger and the coupons bought with points.
///
/// The balance in `users.sweet_points` and the `points_history` table are only ever changed together, in one
/// transaction, so that the balance always equals the sum of the history.
#[allow(async_fn_in_trait)]
pub trait LoyaltyManagement {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, LoyaltyStoreError>;

    /// The user's points history, oldest first.
    async fn fetch_points_history(&self, user_id: i64) -> Result<Vec<PointsEntry>, LoyaltyStoreError>;

    /// Atomically adds `entry.amount` to the user's balance and appends the entry to the history.
    /// Returns the new balance.
    ///
    /// An earned entry for an order that already has one fails with [`LoyaltyStoreError::AlreadyAwarded`].
    async fn credit_points(&self, entry: NewPointsEntry) -> Result<i64, LoyaltyStoreError>;

    /// Exchanges `coupon.points_cost` points for a coupon. In one transaction, the balance is decremented only if it
    /// covers the cost, the coupon is inserted, and a `redeemed` history entry linked to the coupon is appended.
    async fn redeem_points_for_coupon(
        &self,
        coupon: NewCoupon,
        description: &str,
    ) -> Result<Coupon, LoyaltyStoreError>;

    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, LoyaltyStoreError>;

    /// All coupons owned by the user, newest first.
    async fn fetch_coupons_for_user(&self, user_id: i64) -> Result<Vec<Coupon>, LoyaltyStoreError>;

    async fn coupon_code_exists(&self, code: &str) -> Result<bool, LoyaltyStoreError>;
}
