use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{as_customer, TestShop};

#[actix_web::test]
async fn cart_requires_a_caller() {
    let shop = TestShop::new().await;
    let (status, body) = shop.send_json(TestRequest::get().uri("/api/cart")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication Error. The caller could not be identified.");
}

#[actix_web::test]
async fn empty_cart_for_new_customer() {
    let shop = TestShop::new().await;
    let (status, body) = shop.send_json(as_customer(TestRequest::get().uri("/api/cart"), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["summary"]["total"], 0);
}

#[actix_web::test]
async fn adding_the_same_cake_merges_lines() {
    let shop = TestShop::new().await;
    shop.add_cake_to_cart(shop.customer, 1).await;
    shop.add_cake_to_cart(shop.customer, 2).await;
    let (status, body) = shop.send_json(as_customer(TestRequest::get().uri("/api/cart"), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["quantity"], 3);
    // 3 x 1000.00 + 350.00 standard delivery, in cents
    assert_eq!(body["summary"]["subtotal"], 300_000);
    assert_eq!(body["summary"]["shipping"], 35_000);
    assert_eq!(body["summary"]["total"], 335_000);
}

#[actix_web::test]
async fn cart_totals_follow_the_delivery_type() {
    let shop = TestShop::new().await;
    shop.add_cake_to_cart(shop.customer, 1).await;
    let req = as_customer(TestRequest::get().uri("/api/cart?delivery_type=pickup"), shop.customer);
    let (status, body) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivery_type"], "pickup");
    assert_eq!(body["summary"]["shipping"], 0);
    assert_eq!(body["summary"]["total"], 100_000);
}

#[actix_web::test]
async fn unknown_weight_is_rejected() {
    let shop = TestShop::new().await;
    let req = as_customer(TestRequest::post().uri("/api/cart/items"), shop.customer)
        .set_json(json!({ "product_id": shop.cake, "quantity": 1, "weight": "5kg" }));
    let (status, body) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("5kg"));
}

#[actix_web::test]
async fn update_and_remove_lines() {
    let shop = TestShop::new().await;
    shop.add_cake_to_cart(shop.customer, 1).await;
    let req = as_customer(TestRequest::patch().uri("/api/cart/items/0"), shop.customer).set_json(json!({ "quantity": 4 }));
    let (status, body) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 4);

    let req = as_customer(TestRequest::delete().uri("/api/cart/items/3"), shop.customer);
    let (status, _) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = as_customer(TestRequest::delete().uri("/api/cart/items/0"), shop.customer);
    let (status, body) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}

#[actix_web::test]
async fn unknown_promo_code() {
    let shop = TestShop::new().await;
    shop.add_cake_to_cart(shop.customer, 1).await;
    let req = as_customer(TestRequest::post().uri("/api/cart/promo"), shop.customer).set_json(json!({ "code": "NOPE" }));
    let (status, _) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn clear_cart() {
    let shop = TestShop::new().await;
    shop.add_cake_to_cart(shop.customer, 2).await;
    let (status, body) = shop.send_json(as_customer(TestRequest::delete().uri("/api/cart"), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, body) = shop.send_json(as_customer(TestRequest::get().uri("/api/cart"), shop.customer)).await;
    assert_eq!(body["items"], json!([]));
}
