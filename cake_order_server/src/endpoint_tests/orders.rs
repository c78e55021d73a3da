use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{as_customer, checkout_body, TestShop};

#[actix_web::test]
async fn cash_on_delivery_checkout() {
    let shop = TestShop::new().await;
    let result = shop.place_order("cash_on_delivery").await;
    let order = &result["order"];
    assert_eq!(order["order_status"], "confirmed");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["subtotal"], 100_000);
    assert_eq!(order["shipping"], 35_000);
    assert_eq!(order["total"], 135_000);
    assert!(order["order_number"].as_str().unwrap().starts_with("CK"));
    assert!(result["payment_form"].is_null());
    // Cash orders empty the cart straight away
    let (_, cart) = shop.send_json(as_customer(TestRequest::get().uri("/api/cart"), shop.customer)).await;
    assert_eq!(cart["items"], json!([]));
}

#[actix_web::test]
async fn card_checkout_returns_a_signed_form() {
    let shop = TestShop::new().await;
    let result = shop.place_order("gateway").await;
    assert_eq!(result["order"]["order_status"], "pending");
    let form = &result["payment_form"];
    assert_eq!(form["fields"]["amount"], "1350.00");
    assert_eq!(form["fields"]["transaction_uuid"], result["order"]["gateway_transaction_id"]);
    assert!(form["fields"]["signature"].is_string());
    // The cart is kept until the payment goes through
    let (_, cart) = shop.send_json(as_customer(TestRequest::get().uri("/api/cart"), shop.customer)).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn checkout_with_an_empty_cart() {
    let shop = TestShop::new().await;
    let req = as_customer(TestRequest::post().uri("/api/checkout"), shop.customer)
        .set_json(checkout_body("standard", "cash_on_delivery"));
    let (status, body) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request. The cart is empty");
}

#[actix_web::test]
async fn checkout_needs_an_address_for_delivery() {
    let shop = TestShop::new().await;
    shop.add_cake_to_cart(shop.customer, 1).await;
    let mut body = checkout_body("express", "cash_on_delivery");
    body["delivery"]["address"] = json!(null);
    let req = as_customer(TestRequest::post().uri("/api/checkout"), shop.customer).set_json(body);
    let (status, _) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn list_and_fetch_my_orders() {
    let shop = TestShop::new().await;
    let result = shop.place_order("cash_on_delivery").await;
    let id = result["order"]["id"].as_i64().unwrap();

    let (status, orders) = shop.send_json(as_customer(TestRequest::get().uri("/api/orders"), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let uri = format!("/api/orders/{id}");
    let (status, order) = shop.send_json(as_customer(TestRequest::get().uri(&uri), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], id);
}

#[actix_web::test]
async fn other_customers_cannot_see_my_order() {
    let shop = TestShop::new().await;
    let result = shop.place_order("cash_on_delivery").await;
    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}");
    let (status, _) = shop.send_json(as_customer(TestRequest::get().uri(&uri), shop.other_customer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, orders) =
        shop.send_json(as_customer(TestRequest::get().uri("/api/orders"), shop.other_customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders, json!([]));
}

#[actix_web::test]
async fn customer_cancels_a_confirmed_order() {
    let shop = TestShop::new().await;
    let result = shop.place_order("cash_on_delivery").await;
    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}/cancel");
    let req = as_customer(TestRequest::post().uri(&uri), shop.customer).set_json(json!({ "reason": "Party moved" }));
    let (status, order) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order_status"], "cancelled");
    assert_eq!(order["cancel_reason"], "Party moved");
    assert!(order["cancelled_at"].is_string());

    // Cancelled is final
    let req = as_customer(TestRequest::post().uri(&uri), shop.customer);
    let (status, _) = shop.send_json(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn cash_orders_cannot_start_a_card_payment() {
    let shop = TestShop::new().await;
    let result = shop.place_order("cash_on_delivery").await;
    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}/pay");
    let (status, body) = shop.send_json(as_customer(TestRequest::post().uri(&uri), shop.customer)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("cash on delivery"));
}
