use thiserror::Error;

use crate::db_types::Product;

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// Read-only access to the product catalog.
///
/// Checkout never trusts product names, images or prices cached in a cart. It re-reads them through this trait
/// immediately before freezing the order.
#[allow(async_fn_in_trait)]
pub trait CatalogLookup {
    /// Fetches the product with the given id, whether it is active or not. Returns `None` if there is no such product.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError>;
}
