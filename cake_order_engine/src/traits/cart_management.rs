use thiserror::Error;

use crate::db_types::Cart;

#[derive(Debug, Clone, Error)]
pub enum CartStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CartStoreError {
    fn from(e: sqlx::Error) -> Self {
        CartStoreError::DatabaseError(e.to_string())
    }
}

/// Storage for the one-per-user shopping cart.
///
/// Only the cart contents are stored. Totals are derived on every read (see [`crate::db_types::CartSummary`]).
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Fetches the cart for the user. A user that has never added anything gets an empty cart.
    async fn fetch_cart(&self, user_id: i64) -> Result<Cart, CartStoreError>;

    /// Replaces the stored items and promo code for `cart.user_id` with the given values, atomically.
    async fn save_cart(&self, cart: &Cart) -> Result<(), CartStoreError>;

    /// Removes all items and the promo code from the user's cart.
    async fn clear_cart(&self, user_id: i64) -> Result<(), CartStoreError>;
}
