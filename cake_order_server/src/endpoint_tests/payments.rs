use std::collections::BTreeMap;

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};

use super::helpers::{as_customer, signed_notification, TestShop};

fn notify(fields: &BTreeMap<String, String>) -> TestRequest {
    TestRequest::post().uri("/payments/notify").set_form(fields)
}

fn transaction_uuid(result: &Value) -> String {
    result["payment_form"]["fields"]["transaction_uuid"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn complete_notification_pays_the_order() {
    let shop = TestShop::new().await;
    let result = shop.place_order("gateway").await;
    let txid = transaction_uuid(&result);
    let fields = signed_notification(&txid, "COMPLETE", "1350.00");

    let (status, body) = shop.send_json(notify(&fields)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "paid");
    assert_eq!(body["order"]["payment_status"], "paid");
    assert_eq!(body["order"]["order_status"], "confirmed");
    assert_eq!(body["order"]["gateway_details"]["gateway_reference_id"], "GW-REF-7731");

    // A replay changes nothing
    let (status, body) = shop.send_json(notify(&fields)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "already_paid");

    // Paying clears the cart
    let (_, cart) = shop.send_json(as_customer(TestRequest::get().uri("/api/cart"), shop.customer)).await;
    assert_eq!(cart["items"], json!([]));
}

#[actix_web::test]
async fn forged_notification_is_rejected() {
    let shop = TestShop::new().await;
    let result = shop.place_order("gateway").await;
    let txid = transaction_uuid(&result);
    let mut fields = signed_notification(&txid, "COMPLETE", "1350.00");
    fields.insert("amount".to_string(), "1.00".to_string());

    let (status, body) = shop.send_json(notify(&fields)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "The gateway notification could not be authenticated.");

    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}");
    let (_, order) = shop.send_json(as_customer(TestRequest::get().uri(&uri), shop.customer)).await;
    assert_eq!(order["payment_status"], "pending");
}

#[actix_web::test]
async fn wrong_amount_fails_the_payment() {
    let shop = TestShop::new().await;
    let result = shop.place_order("gateway").await;
    let txid = transaction_uuid(&result);
    let fields = signed_notification(&txid, "COMPLETE", "1.00");

    let (status, _) = shop.send_json(notify(&fields)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}");
    let (_, order) = shop.send_json(as_customer(TestRequest::get().uri(&uri), shop.customer)).await;
    assert_eq!(order["payment_status"], "failed");
}

#[actix_web::test]
async fn unknown_transaction() {
    let shop = TestShop::new().await;
    let fields = signed_notification("no-such-transaction", "COMPLETE", "1350.00");
    let (status, _) = shop.send_json(notify(&fields)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn declined_payment_can_be_retried() {
    let shop = TestShop::new().await;
    let result = shop.place_order("gateway").await;
    let first_txid = transaction_uuid(&result);
    let (status, body) = shop.send_json(notify(&signed_notification(&first_txid, "DECLINED", "1350.00"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "marked_failed");

    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}/pay");
    let (status, form) = shop.send_json(as_customer(TestRequest::post().uri(&uri), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    let second_txid = form["fields"]["transaction_uuid"].as_str().unwrap().to_string();
    assert_ne!(first_txid, second_txid);

    // The old attempt no longer matches the order
    let (status, _) = shop.send_json(notify(&signed_notification(&first_txid, "COMPLETE", "1350.00"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = shop.send_json(notify(&signed_notification(&second_txid, "COMPLETE", "1350.00"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "paid");
}

#[actix_web::test]
async fn reopening_the_payment_page_keeps_the_open_attempt() {
    let shop = TestShop::new().await;
    let result = shop.place_order("gateway").await;
    let first_txid = transaction_uuid(&result);
    let id = result["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}/pay");
    let (status, form) = shop.send_json(as_customer(TestRequest::post().uri(&uri), shop.customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["fields"]["transaction_uuid"], first_txid.as_str());

    let (status, body) = shop.send_json(notify(&signed_notification(&first_txid, "COMPLETE", "1350.00"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "paid");
}

#[actix_web::test]
async fn malformed_notification() {
    let shop = TestShop::new().await;
    let mut fields = BTreeMap::new();
    let (status, _) = shop.send_json(notify(&fields)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
