use std::{fmt::Display, str::FromStr};

use cake_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The fulfilment status of an order. Payment has its own, independent axis ([`PaymentStatus`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed, but is waiting on an online payment.
    Pending,
    /// The order is accepted and will be prepared.
    Confirmed,
    /// The bakery is preparing the order.
    Processing,
    /// The order has left the bakery.
    OutForDelivery,
    /// The customer has received the order. Terminal.
    Delivered,
    /// The order was cancelled by the customer or an admin. Terminal.
    Cancelled,
}

impl OrderStatusType {
    /// The statuses that an order in this status may legally move to.
    ///
    /// | From \ To         | confirmed | processing | out_for_delivery | delivered | cancelled |
    /// |-------------------|-----------|------------|------------------|-----------|-----------|
    /// | pending           | ✔         |            |                  |           | ✔         |
    /// | confirmed         |           | ✔          |                  |           | ✔         |
    /// | processing        |           |            | ✔                |           | ✔         |
    /// | out_for_delivery  |           |            |                  | ✔         |           |
    /// | delivered         |           |            |                  |           |           |
    /// | cancelled         |           |            |                  |           |           |
    pub fn legal_transitions(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[OutForDelivery, Cancelled],
            OutForDelivery => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatusType) -> bool {
        self.legal_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.legal_transitions().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Confirmed => "confirmed",
            OrderStatusType::Processing => "processing",
            OrderStatusType::OutForDelivery => "out_for_delivery",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Cancelled => "cancelled",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid online through the hosted payment page of the card gateway.
    Gateway,
    CashOnDelivery,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Gateway => write!(f, "gateway"),
            PaymentMethod::CashOnDelivery => write!(f, "cash_on_delivery"),
        }
    }
}

//--------------------------------------    DeliveryType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    #[default]
    Standard,
    Express,
    Pickup,
}

impl Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryType::Standard => write!(f, "standard"),
            DeliveryType::Express => write!(f, "express"),
            DeliveryType::Pickup => write!(f, "pickup"),
        }
    }
}

//--------------------------------------    DiscountType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the subtotal.
    Percentage,
    /// `discount_value` is an amount in minor currency units.
    Fixed,
}

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The human-facing order identifier, e.g. `CK-7Q2M9X`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      Products         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightTier {
    /// e.g. "1kg"
    pub weight: String,
    /// e.g. "Serves 8-10"
    pub label: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    pub name: String,
    pub value: String,
}

/// The catalog's view of a product, as needed by the cart and checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub images: Vec<String>,
    pub weights: Vec<WeightTier>,
    pub is_active: bool,
}

impl Product {
    pub fn weight_tier(&self, weight: &str) -> Option<&WeightTier> {
        self.weights.iter().find(|w| w.weight == weight)
    }

    pub fn primary_image(&self) -> Option<String> {
        self.images.first().cloned()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub weights: Vec<WeightTier>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

//--------------------------------------      PromoCode        ---------------------------------------------------------
/// A discount descriptor. Carts and orders hold a copy of this, never a live reference to the coupon it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_discount: Option<Money>,
    pub min_order_amount: Option<Money>,
}

impl PromoCode {
    pub fn meets_minimum(&self, subtotal: Money) -> bool {
        self.min_order_amount.map(|min| subtotal >= min).unwrap_or(true)
    }

    /// The discount this code gives on the given subtotal. Never more than the subtotal, and zero when the minimum
    /// order amount is not met.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        if !self.meets_minimum(subtotal) {
            return Money::default();
        }
        let raw = match self.discount_type {
            DiscountType::Percentage => subtotal.percent(self.discount_value),
            DiscountType::Fixed => Money::from(self.discount_value),
        };
        let capped = match self.max_discount {
            Some(max) => raw.min(max),
            None => raw,
        };
        capped.min(subtotal).max(Money::default())
    }
}

impl From<&Coupon> for PromoCode {
    fn from(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            max_discount: coupon.max_discount,
            min_order_amount: coupon.min_order_amount,
        }
    }
}

//--------------------------------------        Cart           ---------------------------------------------------------
pub const MAX_CART_ITEM_QUANTITY: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: u32,
    pub weight: WeightTier,
    #[serde(default)]
    pub customizations: Vec<Customization>,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.weight.price * i64::from(self.quantity)
    }

    /// Two lines are the same if they would produce identical order items.
    pub fn is_same_line(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id &&
            self.weight == other.weight &&
            self.customizations == other.customizations
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: i64,
    pub items: Vec<CartItem>,
    pub promo_code: Option<PromoCode>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

/// Values derived from the cart contents. These are never stored on the cart; they are recomputed on every read and
/// frozen into the order at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub item_count: u32,
}

impl CartSummary {
    pub fn compute(cart: &Cart, shipping_fee: Money) -> Self {
        let subtotal = cart.subtotal();
        let item_count = cart.items.iter().map(|i| i.quantity).sum();
        let shipping = if cart.is_empty() { Money::default() } else { shipping_fee };
        let discount_amount = cart.promo_code.as_ref().map(|p| p.discount_for(subtotal)).unwrap_or_default();
        let total = subtotal + shipping - discount_amount;
        Self { subtotal, shipping, discount_amount, total, item_count }
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
/// A frozen copy of a cart line. Later catalog changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// `None` for custom, off-catalog items.
    pub product_id: Option<i64>,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub weight: WeightTier,
    pub customizations: Vec<Customization>,
    pub item_total: Money,
}

impl OrderItem {
    pub fn snapshot(item: &CartItem, product: &Product) -> Self {
        Self {
            product_id: Some(product.id),
            name: product.name.clone(),
            image: product.primary_image(),
            quantity: item.quantity,
            weight: item.weight.clone(),
            customizations: item.customizations.clone(),
            item_total: item.line_total(),
        }
    }
}

//--------------------------------------   Delivery details    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub delivery_type: DeliveryType,
    pub recipient_name: String,
    pub phone: String,
    /// Required unless the order is picked up from the bakery.
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySchedule {
    pub date: DateTime<Utc>,
    pub time_slot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDetails {
    pub transaction_id: String,
    pub gateway_reference_id: String,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub promo_code: Option<PromoCode>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    /// The correlation key handed to the gateway when the payment was last initiated.
    pub gateway_transaction_id: Option<String>,
    pub gateway_details: Option<GatewayDetails>,
    pub delivery: DeliveryInfo,
    pub delivery_schedule: DeliverySchedule,
    pub notes: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// `total = subtotal + shipping - discount`, with every component non-negative.
    pub fn totals_are_consistent(&self) -> bool {
        !self.subtotal.is_negative() &&
            !self.shipping.is_negative() &&
            !self.discount.is_negative() &&
            !self.total.is_negative() &&
            self.total == self.subtotal + self.shipping - self.discount
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// Everything needed to insert an order. Produced by checkout from a cart.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub summary: CartSummary,
    pub promo_code: Option<PromoCode>,
    pub payment_method: PaymentMethod,
    pub order_status: OrderStatusType,
    pub delivery: DeliveryInfo,
    pub delivery_schedule: DeliverySchedule,
    pub notes: Option<String>,
}

impl NewOrder {
    /// The coupon that must be consumed when this order is stored, if the promo code came from one.
    pub fn coupon_code(&self) -> Option<&str> {
        self.promo_code.as_ref().map(|p| p.code.as_str())
    }
}

/// The audit fields written alongside a fulfilment status change.
#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Set when the change also settles payment, i.e. cash collected on delivery.
    pub payment_status: Option<PaymentStatus>,
}

//--------------------------------------        Users          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub sweet_points: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(name: S, email: S) -> Self {
        Self { name: name.into(), email: email.into() }
    }
}

//--------------------------------------    Loyalty ledger     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PointsEntryType {
    Earned,
    Redeemed,
}

impl Display for PointsEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointsEntryType::Earned => write!(f, "earned"),
            PointsEntryType::Redeemed => write!(f, "redeemed"),
        }
    }
}

/// One line in a user's append-only points history. `amount` is signed: positive for earned points, negative for
/// redemptions.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PointsEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub entry_type: PointsEntryType,
    pub description: String,
    pub order_id: Option<i64>,
    pub coupon_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPointsEntry {
    pub user_id: i64,
    pub amount: i64,
    pub entry_type: PointsEntryType,
    pub description: String,
    pub order_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyAccount {
    pub user_id: i64,
    pub sweet_points: i64,
    pub history: Vec<PointsEntry>,
}

impl LoyaltyAccount {
    /// The balance must always equal the sum of the history.
    pub fn is_balanced(&self) -> bool {
        self.sweet_points == self.history.iter().map(|e| e.amount).sum::<i64>()
    }
}

//--------------------------------------       Coupons         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_discount: Option<Money>,
    pub min_order_amount: Option<Money>,
    pub reward_tier_id: String,
    pub reward_name: String,
    pub points_cost: i64,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub used_in_order: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub user_id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_discount: Option<Money>,
    pub min_order_amount: Option<Money>,
    pub reward_tier_id: String,
    pub reward_name: String,
    pub points_cost: i64,
    pub expires_at: DateTime<Utc>,
}
