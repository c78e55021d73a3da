use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    cake_api::{
        engine_config::{LoyaltyConfig, RewardTier},
        errors::LoyaltyApiError,
        loyalty_objects::PointsAward,
    },
    db_types::{Coupon, LoyaltyAccount, NewCoupon, NewPointsEntry, PointsEntryType},
    events::{EventProducers, PointsAwardedEvent},
    helpers::new_coupon_code,
    traits::{LoyaltyManagement, OrderManagement},
};

const MAX_COUPON_CODE_ATTEMPTS: usize = 10;

/// `LoyaltyApi` manages the "sweet points" ledger: awarding points for delivered orders and exchanging points for
/// coupons.
pub struct LoyaltyApi<B> {
    db: B,
    config: LoyaltyConfig,
    producers: EventProducers,
}

impl<B> Debug for LoyaltyApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoyaltyApi")
    }
}

impl<B> LoyaltyApi<B> {
    pub fn new(db: B, config: LoyaltyConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }

    pub fn reward_tiers(&self) -> &[RewardTier] {
        &self.config.reward_tiers
    }
}

impl<B> LoyaltyApi<B>
where B: LoyaltyManagement + OrderManagement
{
    /// Credits the points earned by an order. The first-order bonus applies when the order is the user's only
    /// non-cancelled order.
    ///
    /// The balance increment and the history entry are written in one transaction. A second award for the same order
    /// fails with [`LoyaltyApiError::AlreadyAwarded`].
    pub async fn award_points_for_order(
        &self,
        user_id: i64,
        order_id: i64,
        amount: cake_common::Money,
    ) -> Result<PointsAward, LoyaltyApiError> {
        let active_orders = self.db.count_active_orders_for_user(user_id).await?;
        let award = PointsAward::calculate(amount, active_orders == 1, &self.config);
        if award.total <= 0 {
            debug!("🍬️ Order #{order_id} for {amount} does not earn any points");
            return Ok(award);
        }
        let entry = NewPointsEntry {
            user_id,
            amount: award.total,
            entry_type: PointsEntryType::Earned,
            description: award.description(order_id),
            order_id: Some(order_id),
        };
        let balance = self.db.credit_points(entry).await?;
        info!("🍬️ User #{user_id} earned {} points for order #{order_id}. Balance: {balance}", award.total);
        let event = PointsAwardedEvent { user_id, order_id, award };
        self.producers.publish_points_awarded(event).await;
        Ok(award)
    }

    /// Exchanges points for a coupon from the given reward tier. The balance check, the decrement, the coupon and the
    /// history entry all happen in one transaction, so a failure leaves neither a missing balance nor an orphan coupon.
    pub async fn redeem_reward(&self, user_id: i64, tier_id: &str) -> Result<Coupon, LoyaltyApiError> {
        let tier = self.config.reward_tier(tier_id).ok_or_else(|| LoyaltyApiError::UnknownTier(tier_id.to_string()))?;
        let user = self.db.fetch_user(user_id).await?.ok_or(LoyaltyApiError::UserNotFound(user_id))?;
        if user.sweet_points < tier.points_cost {
            debug!("🍬️ User #{user_id} has {} points, but {} costs {}", user.sweet_points, tier.id, tier.points_cost);
            return Err(LoyaltyApiError::InsufficientPoints {
                required: tier.points_cost,
                available: user.sweet_points,
                shortfall: tier.points_cost - user.sweet_points,
            });
        }
        let code = self.unused_coupon_code().await?;
        let coupon = NewCoupon {
            user_id,
            code,
            discount_type: tier.discount_type,
            discount_value: tier.discount_value,
            max_discount: tier.max_discount,
            min_order_amount: tier.min_order_amount,
            reward_tier_id: tier.id.clone(),
            reward_name: tier.name.clone(),
            points_cost: tier.points_cost,
            expires_at: Utc::now() + Duration::days(tier.validity_days),
        };
        let description = format!("Redeemed for {}", tier.name);
        let coupon = self.db.redeem_points_for_coupon(coupon, &description).await?;
        info!("🍬️ User #{user_id} redeemed {} points for coupon {}", tier.points_cost, coupon.code);
        Ok(coupon)
    }

    pub async fn account(&self, user_id: i64) -> Result<LoyaltyAccount, LoyaltyApiError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(LoyaltyApiError::UserNotFound(user_id))?;
        let history = self.db.fetch_points_history(user_id).await?;
        Ok(LoyaltyAccount { user_id, sweet_points: user.sweet_points, history })
    }

    pub async fn coupons_for_user(&self, user_id: i64) -> Result<Vec<Coupon>, LoyaltyApiError> {
        let coupons = self.db.fetch_coupons_for_user(user_id).await?;
        Ok(coupons)
    }

    async fn unused_coupon_code(&self) -> Result<String, LoyaltyApiError> {
        for _ in 0..MAX_COUPON_CODE_ATTEMPTS {
            let code = new_coupon_code();
            if !self.db.coupon_code_exists(&code).await? {
                return Ok(code);
            }
            trace!("🍬️ Coupon code {code} is taken. Trying another");
        }
        Err(LoyaltyApiError::CouponCodeExhausted(MAX_COUPON_CODE_ATTEMPTS))
    }
}
