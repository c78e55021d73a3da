use std::fmt::Display;

use cake_order_engine::db_types::{DeliveryType, OrderStatusType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartQuery {
    pub delivery_type: Option<DeliveryType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityParams {
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyCouponParams {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelOrderParams {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: OrderStatusType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRewardParams {
    pub tier_id: String,
}
