use cake_order_engine::{
    db_types::{NewPointsEntry, PointsEntryType},
    traits::LoyaltyManagement,
};
use cucumber::{given, then, when};

use crate::cucumber::CakeWorld;

#[given(expr = "'{word}' has been given {int} sweet points")]
async fn give_points(world: &mut CakeWorld, user: String, points: i64) {
    let entry = NewPointsEntry {
        user_id: world.user_id(&user),
        amount: points,
        entry_type: PointsEntryType::Earned,
        description: "Welcome gift".into(),
        order_id: None,
    };
    world.db().credit_points(entry).await.expect("Error crediting points");
}

#[when(expr = "'{word}' redeems the reward tier '{word}'")]
async fn redeem(world: &mut CakeWorld, user: String, tier: String) {
    let user_id = world.user_id(&user);
    match world.orders().loyalty().redeem_reward(user_id, &tier).await {
        Ok(coupon) => {
            world.last_coupon = Some(coupon);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "points for the order are awarded again")]
async fn award_again(world: &mut CakeWorld) {
    let order = world.last_order().clone();
    match world.orders().loyalty().award_points_for_order(order.user_id, order.id, order.total).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "'{word}' has {int} sweet points")]
async fn check_points(world: &mut CakeWorld, user: String, points: i64) {
    let account = world.orders().loyalty().account(world.user_id(&user)).await.expect("Error fetching account");
    assert_eq!(account.sweet_points, points, "Sweet points balance is incorrect");
}

#[then(expr = "the points ledger for '{word}' has {int} entr(y)(ies)")]
async fn check_history(world: &mut CakeWorld, user: String, count: usize) {
    let account = world.orders().loyalty().account(world.user_id(&user)).await.expect("Error fetching account");
    assert_eq!(account.history.len(), count);
}

#[then(expr = "the points ledger for '{word}' balances")]
async fn ledger_balances(world: &mut CakeWorld, user: String) {
    let account = world.orders().loyalty().account(world.user_id(&user)).await.expect("Error fetching account");
    assert!(account.is_balanced(), "Balance {} does not match the ledger", account.sweet_points);
}

#[then(expr = "'{word}' has {int} coupon(s)")]
async fn check_coupons(world: &mut CakeWorld, user: String, count: usize) {
    let coupons = world.db().fetch_coupons_for_user(world.user_id(&user)).await.expect("Error fetching coupons");
    assert_eq!(coupons.len(), count);
}

#[then(expr = "the coupon is used")]
async fn coupon_is_used(world: &mut CakeWorld) {
    let code = world.last_coupon.as_ref().expect("No coupon has been redeemed").code.clone();
    let coupon = world.db().fetch_coupon_by_code(&code).await.expect("Error fetching coupon").expect("No coupon");
    assert!(coupon.is_used, "Coupon {code} should be used");
    assert!(coupon.used_at.is_some());
}

#[then(expr = "the coupon code starts with '{word}'")]
async fn coupon_prefix(world: &mut CakeWorld, prefix: String) {
    let code = &world.last_coupon.as_ref().expect("No coupon has been redeemed").code;
    assert!(code.starts_with(&prefix), "Coupon code {code} does not start with {prefix}");
}
