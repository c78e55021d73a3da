use std::fmt::Debug;

use cake_common::Money;
use chrono::{DateTime, Utc};
use log::*;

use crate::{
    cake_api::{
        cart_objects::{AddCartItem, CartView},
        engine_config::ShippingRates,
        errors::CartApiError,
    },
    db_types::{Cart, CartItem, CartSummary, Coupon, DeliveryType, PromoCode, MAX_CART_ITEM_QUANTITY},
    traits::{CartManagement, CatalogLookup, LoyaltyManagement},
};

/// `CartApi` manages the single, mutable cart each customer has, up to the point where checkout turns it into an
/// order.
pub struct CartApi<B> {
    db: B,
    shipping: ShippingRates,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B, shipping: ShippingRates) -> Self {
        Self { db, shipping }
    }
}

impl<B> CartApi<B>
where B: CartManagement + CatalogLookup + LoyaltyManagement
{
    /// The cart with totals for standard delivery.
    pub async fn cart(&self, user_id: i64) -> Result<CartView, CartApiError> {
        self.cart_for_delivery(user_id, DeliveryType::default()).await
    }

    /// The cart with totals for the given delivery type.
    pub async fn cart_for_delivery(&self, user_id: i64, delivery_type: DeliveryType) -> Result<CartView, CartApiError> {
        let cart = self.db.fetch_cart(user_id).await?;
        Ok(self.view(cart, delivery_type))
    }

    /// Adds a product to the cart. If an identical line (same product, weight and customisations) is already in the
    /// cart, its quantity is increased instead.
    pub async fn add_item(&self, user_id: i64, item: AddCartItem) -> Result<CartView, CartApiError> {
        check_quantity(item.quantity)?;
        let product = self.db.fetch_product(item.product_id).await?.ok_or(CartApiError::ProductNotFound(item.product_id))?;
        if !product.is_active {
            return Err(CartApiError::ProductInactive(product.id));
        }
        let weight = product
            .weight_tier(&item.weight)
            .cloned()
            .ok_or_else(|| CartApiError::UnknownWeight { product_id: product.id, weight: item.weight.clone() })?;
        let new_item = CartItem {
            product_id: product.id,
            quantity: item.quantity,
            weight,
            customizations: item.customizations,
        };
        let mut cart = self.db.fetch_cart(user_id).await?;
        match cart.items.iter_mut().find(|i| i.is_same_line(&new_item)) {
            Some(existing) => {
                let quantity = existing.quantity + new_item.quantity;
                check_quantity(quantity)?;
                existing.quantity = quantity;
            },
            None => cart.items.push(new_item),
        }
        self.db.save_cart(&cart).await?;
        debug!("🛒️ User #{user_id} added {} x product #{} to their cart", item.quantity, product.id);
        Ok(self.view(cart, DeliveryType::default()))
    }

    pub async fn update_quantity(&self, user_id: i64, index: usize, quantity: u32) -> Result<CartView, CartApiError> {
        check_quantity(quantity)?;
        let mut cart = self.db.fetch_cart(user_id).await?;
        let item = cart.items.get_mut(index).ok_or(CartApiError::ItemNotFound(index))?;
        item.quantity = quantity;
        self.db.save_cart(&cart).await?;
        debug!("🛒️ User #{user_id} set the quantity of cart line {index} to {quantity}");
        Ok(self.view(cart, DeliveryType::default()))
    }

    pub async fn remove_item(&self, user_id: i64, index: usize) -> Result<CartView, CartApiError> {
        let mut cart = self.db.fetch_cart(user_id).await?;
        if index >= cart.items.len() {
            return Err(CartApiError::ItemNotFound(index));
        }
        cart.items.remove(index);
        self.db.save_cart(&cart).await?;
        debug!("🛒️ User #{user_id} removed cart line {index}");
        Ok(self.view(cart, DeliveryType::default()))
    }

    /// Applies one of the user's coupons to the cart. The coupon's discount terms are copied into the cart; the coupon
    /// itself is only marked as used when an order is placed with it.
    pub async fn apply_coupon(&self, user_id: i64, code: &str) -> Result<CartView, CartApiError> {
        let code = code.trim().to_uppercase();
        let coupon = self.db.fetch_coupon_by_code(&code).await?.ok_or_else(|| CartApiError::CouponNotFound(code.clone()))?;
        let mut cart = self.db.fetch_cart(user_id).await?;
        validate_coupon(&coupon, user_id, cart.subtotal(), Utc::now())?;
        cart.promo_code = Some(PromoCode::from(&coupon));
        self.db.save_cart(&cart).await?;
        debug!("🛒️ User #{user_id} applied coupon {code} to their cart");
        Ok(self.view(cart, DeliveryType::default()))
    }

    pub async fn remove_promo_code(&self, user_id: i64) -> Result<CartView, CartApiError> {
        let mut cart = self.db.fetch_cart(user_id).await?;
        if let Some(promo) = cart.promo_code.take() {
            self.db.save_cart(&cart).await?;
            debug!("🛒️ User #{user_id} removed promo code {} from their cart", promo.code);
        }
        Ok(self.view(cart, DeliveryType::default()))
    }

    pub async fn clear(&self, user_id: i64) -> Result<(), CartApiError> {
        self.db.clear_cart(user_id).await?;
        debug!("🛒️ User #{user_id} emptied their cart");
        Ok(())
    }

    fn view(&self, cart: Cart, delivery_type: DeliveryType) -> CartView {
        let summary = CartSummary::compute(&cart, self.shipping.fee_for(delivery_type));
        CartView::new(cart, delivery_type, summary)
    }
}

fn check_quantity(quantity: u32) -> Result<(), CartApiError> {
    if (1..=MAX_CART_ITEM_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(CartApiError::InvalidQuantity { quantity, max: MAX_CART_ITEM_QUANTITY })
    }
}

/// Checks that `user_id` may use the coupon on a cart with the given subtotal at time `now`. A coupon that belongs to
/// someone else is reported as not found.
pub(crate) fn validate_coupon(
    coupon: &Coupon,
    user_id: i64,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<(), CartApiError> {
    if coupon.user_id != user_id {
        return Err(CartApiError::CouponNotFound(coupon.code.clone()));
    }
    if coupon.is_used {
        return Err(CartApiError::CouponAlreadyUsed(coupon.code.clone()));
    }
    if coupon.is_expired_at(now) {
        return Err(CartApiError::CouponExpired(coupon.code.clone()));
    }
    if let Some(required) = coupon.min_order_amount {
        if subtotal < required {
            return Err(CartApiError::MinimumOrderNotMet { code: coupon.code.clone(), required, subtotal });
        }
    }
    Ok(())
}
