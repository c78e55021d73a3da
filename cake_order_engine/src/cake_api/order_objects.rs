use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cake_api::{errors::OrderFlowError, payment_objects::GatewayPaymentForm},
    db_types::{DeliveryInfo, DeliverySchedule, DeliveryType, Order, PaymentMethod},
};

/// Cakes are baked to order, so deliveries must be booked at least this far ahead.
pub const MIN_SCHEDULE_LEAD_TIME_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryInfo,
    pub schedule: DeliverySchedule,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), OrderFlowError> {
        let invalid = |msg: &str| Err(OrderFlowError::InvalidCheckout(msg.to_string()));
        if self.schedule.date < now + Duration::hours(MIN_SCHEDULE_LEAD_TIME_HOURS) {
            return invalid("the delivery date must be at least 24 hours from now");
        }
        if self.schedule.time_slot.trim().is_empty() {
            return invalid("a delivery time slot is required");
        }
        if self.delivery.recipient_name.trim().is_empty() {
            return invalid("a recipient name is required");
        }
        if self.delivery.phone.trim().is_empty() {
            return invalid("a contact phone number is required");
        }
        let has_address = self.delivery.address.as_deref().map(|a| !a.trim().is_empty()).unwrap_or(false);
        if self.delivery.delivery_type != DeliveryType::Pickup && !has_address {
            return invalid("a delivery address is required unless the order is picked up");
        }
        Ok(())
    }
}

/// The order placed at checkout. Gateway orders also carry the signed payment form, so that the customer can be sent
/// straight to the payment page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub payment_form: Option<GatewayPaymentForm>,
}
