use serde::{Deserialize, Serialize};

use crate::db_types::{Cart, CartItem, CartSummary, Customization, DeliveryType, PromoCode};

/// A request to put a product in the cart. The price is never taken from the caller; it is looked up from the
/// catalog using `weight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCartItem {
    pub product_id: i64,
    pub quantity: u32,
    /// The weight tier, e.g. "1kg". Must be one of the product's tiers.
    pub weight: String,
    #[serde(default)]
    pub customizations: Vec<Customization>,
}

/// The cart as the customer sees it: the stored contents plus the derived totals for a delivery type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub user_id: i64,
    pub items: Vec<CartItem>,
    pub promo_code: Option<PromoCode>,
    pub delivery_type: DeliveryType,
    pub summary: CartSummary,
}

impl CartView {
    pub fn new(cart: Cart, delivery_type: DeliveryType, summary: CartSummary) -> Self {
        Self { user_id: cart.user_id, items: cart.items, promo_code: cart.promo_code, delivery_type, summary }
    }
}
