//! Configuration values that the engine APIs are constructed with. Nothing in the engine reads the environment
//! directly; the server builds an [`EngineConfig`] once at startup and hands it to each API.
use cake_common::{Money, Secret, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};

use crate::db_types::{DeliveryType, DiscountType};

pub const DEFAULT_ORDER_NUMBER_PREFIX: &str = "CK";
pub const DEFAULT_SPENDING_RATIO: i64 = 10;
pub const DEFAULT_FIRST_ORDER_BONUS: i64 = 50;
pub const DEFAULT_GATEWAY_ACTION_URL: &str = "https://testsecureacceptance.cybersource.com/pay";
pub const DEFAULT_GATEWAY_LOCALE: &str = "en";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub order_number_prefix: String,
    pub shipping: ShippingRates,
    pub loyalty: LoyaltyConfig,
    pub gateway: GatewayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(ShippingRates::default(), LoyaltyConfig::default(), GatewayConfig::default())
    }
}

impl EngineConfig {
    pub fn new(shipping: ShippingRates, loyalty: LoyaltyConfig, gateway: GatewayConfig) -> Self {
        Self { order_number_prefix: DEFAULT_ORDER_NUMBER_PREFIX.to_string(), shipping, loyalty, gateway }
    }

    pub fn with_order_number_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.order_number_prefix = prefix.into();
        self
    }
}

//--------------------------------------    ShippingRates      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRates {
    pub standard: Money,
    pub express: Money,
    pub pickup: Money,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self { standard: Money::from_major(350), express: Money::from_major(750), pickup: Money::default() }
    }
}

impl ShippingRates {
    pub fn fee_for(&self, delivery_type: DeliveryType) -> Money {
        match delivery_type {
            DeliveryType::Standard => self.standard,
            DeliveryType::Express => self.express,
            DeliveryType::Pickup => self.pickup,
        }
    }
}

//--------------------------------------    LoyaltyConfig      ---------------------------------------------------------
/// An order at or above `amount` earns `bonus` extra points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub amount: Money,
    pub bonus: i64,
}

/// What a reward tier costs, and the coupon it buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTier {
    pub id: String,
    pub name: String,
    pub points_cost: i64,
    pub discount_type: DiscountType,
    /// Percentage points for [`DiscountType::Percentage`], minor currency units for [`DiscountType::Fixed`].
    pub discount_value: i64,
    pub max_discount: Option<Money>,
    pub min_order_amount: Option<Money>,
    pub validity_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// How many major currency units buy one point.
    pub spending_ratio: i64,
    pub first_order_bonus: i64,
    pub milestones: Vec<Milestone>,
    pub reward_tiers: Vec<RewardTier>,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            spending_ratio: DEFAULT_SPENDING_RATIO,
            first_order_bonus: DEFAULT_FIRST_ORDER_BONUS,
            milestones: default_milestones(),
            reward_tiers: default_reward_tiers(),
        }
    }
}

impl LoyaltyConfig {
    pub fn reward_tier(&self, id: &str) -> Option<&RewardTier> {
        self.reward_tiers.iter().find(|t| t.id == id)
    }
}

pub fn default_milestones() -> Vec<Milestone> {
    vec![
        Milestone { amount: Money::from_major(1000), bonus: 20 },
        Milestone { amount: Money::from_major(2500), bonus: 50 },
        Milestone { amount: Money::from_major(5000), bonus: 100 },
    ]
}

pub fn default_reward_tiers() -> Vec<RewardTier> {
    vec![
        RewardTier {
            id: "tier_100".into(),
            name: "5% off your next cake".into(),
            points_cost: 100,
            discount_type: DiscountType::Percentage,
            discount_value: 5,
            max_discount: Some(Money::from_major(500)),
            min_order_amount: None,
            validity_days: 30,
        },
        RewardTier {
            id: "tier_250".into(),
            name: "300 off orders over 1500".into(),
            points_cost: 250,
            discount_type: DiscountType::Fixed,
            discount_value: Money::from_major(300).value(),
            max_discount: None,
            min_order_amount: Some(Money::from_major(1500)),
            validity_days: 30,
        },
        RewardTier {
            id: "tier_500".into(),
            name: "15% off your next cake".into(),
            points_cost: 500,
            discount_type: DiscountType::Percentage,
            discount_value: 15,
            max_discount: Some(Money::from_major(1500)),
            min_order_amount: None,
            validity_days: 60,
        },
    ]
}

//--------------------------------------    GatewayConfig      ---------------------------------------------------------
/// Merchant credentials and URLs for the card gateway's hosted payment page.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub access_key: String,
    pub profile_id: String,
    pub secret_key: Secret<String>,
    pub action_url: String,
    pub success_url: String,
    pub failure_url: String,
    pub notify_url: String,
    pub currency: String,
    pub locale: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            access_key: String::default(),
            profile_id: String::default(),
            secret_key: Secret::default(),
            action_url: DEFAULT_GATEWAY_ACTION_URL.to_string(),
            success_url: String::default(),
            failure_url: String::default(),
            notify_url: String::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            locale: DEFAULT_GATEWAY_LOCALE.to_string(),
        }
    }
}
