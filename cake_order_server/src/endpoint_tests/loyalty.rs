use actix_web::{http::StatusCode, test::TestRequest};
use cake_order_engine::{
    db_types::{NewPointsEntry, PointsEntryType},
    traits::LoyaltyManagement,
};
use serde_json::json;

use super::helpers::{as_customer, checkout_body, TestShop};

async fn give_points(shop: &TestShop, user_id: i64, amount: i64) {
    let entry = NewPointsEntry {
        user_id,
        amount,
        entry_type: PointsEntryType::Earned,
        description: "Welcome gift".into(),
        order_id: None,
    };
    shop.db.credit_points(entry).await.expect("Error crediting points");
}

fn redeem(user_id: i64, tier_id: &str) -> TestRequest {
    as_customer(TestRequest::post().uri("/api/loyalty/redeem"), user_id).set_json(json!({ "tier_id": tier_id }))
}

#[actix_web::test]
async fn new_customers_start_with_no_points() {
    let shop = TestShop::new().await;
    let (status, account) = shop.send_json(as_customer(TestRequest::get().uri("/api/loyalty"), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["sweet_points"], 0);
    assert_eq!(account["history"], json!([]));
}

#[actix_web::test]
async fn reward_catalog() {
    let shop = TestShop::new().await;
    let (status, tiers) = shop.send_json(TestRequest::get().uri("/api/loyalty/tiers")).await;
    assert_eq!(status, StatusCode::OK);
    let ids = tiers.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap().to_string()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["tier_100", "tier_250", "tier_500"]);
}

#[actix_web::test]
async fn not_enough_points() {
    let shop = TestShop::new().await;
    give_points(&shop, shop.customer, 80).await;
    let (status, body) = shop.send_json(redeem(shop.customer, "tier_100")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Earn 20 more"));

    let (status, _) = shop.send_json(redeem(shop.customer, "tier_9000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn redeem_and_spend_a_coupon() {
    let shop = TestShop::new().await;
    give_points(&shop, shop.customer, 150).await;
    let (status, coupon) = shop.send_json(redeem(shop.customer, "tier_100")).await;
    assert_eq!(status, StatusCode::CREATED);
    let code = coupon["code"].as_str().unwrap().to_string();

    let (_, account) = shop.send_json(as_customer(TestRequest::get().uri("/api/loyalty"), shop.customer)).await;
    assert_eq!(account["sweet_points"], 50);
    assert_eq!(account["history"].as_array().unwrap().len(), 2);

    // 5% off a 1000.00 cake
    shop.add_cake_to_cart(shop.customer, 1).await;
    let req = as_customer(TestRequest::post().uri("/api/cart/promo"), shop.customer).set_json(json!({ "code": code }));
    let (status, cart) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["summary"]["discount_amount"], 5_000);

    let req = as_customer(TestRequest::post().uri("/api/checkout"), shop.customer)
        .set_json(checkout_body("standard", "cash_on_delivery"));
    let (status, result) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["order"]["discount"], 5_000);
    assert_eq!(result["order"]["total"], 130_000);

    let (_, coupons) =
        shop.send_json(as_customer(TestRequest::get().uri("/api/loyalty/coupons"), shop.customer)).await;
    assert_eq!(coupons[0]["is_used"], true);

    // Single use
    shop.add_cake_to_cart(shop.customer, 1).await;
    let req = as_customer(TestRequest::post().uri("/api/cart/promo"), shop.customer).set_json(json!({ "code": code }));
    let (status, _) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn coupons_belong_to_their_owner() {
    let shop = TestShop::new().await;
    give_points(&shop, shop.customer, 100).await;
    let (_, coupon) = shop.send_json(redeem(shop.customer, "tier_100")).await;
    let code = coupon["code"].as_str().unwrap().to_string();

    shop.add_cake_to_cart(shop.other_customer, 1).await;
    let req =
        as_customer(TestRequest::post().uri("/api/cart/promo"), shop.other_customer).set_json(json!({ "code": code }));
    let (status, _) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
