use cake_common::Money;
use serde::{Deserialize, Serialize};

use crate::cake_api::engine_config::LoyaltyConfig;

/// The breakdown of points earned by one delivered order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAward {
    pub base_points: i64,
    pub first_order_bonus: i64,
    pub milestone_bonus: i64,
    pub total: i64,
}

impl PointsAward {
    /// `floor(amount / spending_ratio)` base points, plus the first-order bonus, plus the bonus of every milestone the
    /// amount reaches. Milestones are additive: a large order collects all the bonuses below it.
    pub fn calculate(amount: Money, is_first_order: bool, config: &LoyaltyConfig) -> Self {
        let base_points = if config.spending_ratio > 0 && !amount.is_negative() {
            amount.major_units() / config.spending_ratio
        } else {
            0
        };
        let first_order_bonus = if is_first_order { config.first_order_bonus } else { 0 };
        let milestone_bonus = config.milestones.iter().filter(|m| amount >= m.amount).map(|m| m.bonus).sum();
        let total = base_points + first_order_bonus + milestone_bonus;
        Self { base_points, first_order_bonus, milestone_bonus, total }
    }

    pub fn is_first_order(&self) -> bool {
        self.first_order_bonus > 0
    }

    pub fn description(&self, order_id: i64) -> String {
        if self.is_first_order() {
            format!("First order bonus! Points earned for order #{order_id}")
        } else {
            format!("Points earned for order #{order_id}")
        }
    }
}
