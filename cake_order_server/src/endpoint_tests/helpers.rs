use std::collections::BTreeMap;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use cake_common::{Money, Secret};
use cake_order_engine::{
    db_types::{NewProduct, NewUser, WeightTier},
    helpers::{sign_fields, SIGNED_FIELD_NAMES},
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    CartApi,
    EngineConfig,
    EventProducers,
    GatewayConfig,
    LoyaltyApi,
    LoyaltyConfig,
    OrderFlowApi,
    ShippingRates,
    SqliteDatabase,
};
use chrono::{Duration, Utc};
use log::debug;
use serde_json::{json, Value};

use crate::{
    auth::{AdminKey, ADMIN_KEY_HEADER, USER_ID_HEADER},
    server::configure_routes,
};

// DO NOT re-use these keys anywhere.
pub const ADMIN_KEY: &str = "endpoint-test-admin-key";
pub const GATEWAY_SECRET: &str = "endpoint-test-gateway-secret";

/// A shop backed by its own throwaway SQLite database, with one customer and one cake on the menu.
pub struct TestShop {
    pub db: SqliteDatabase,
    pub config: EngineConfig,
    pub customer: i64,
    pub other_customer: i64,
    pub cake: i64,
}

impl TestShop {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        let customer = db.create_user(NewUser::new("Alice", "alice@example.com")).await.expect("Error creating user").id;
        let other_customer =
            db.create_user(NewUser::new("Bob", "bob@example.com")).await.expect("Error creating user").id;
        let cake = db
            .create_product(NewProduct {
                name: "Chocolate Fudge".into(),
                images: vec![],
                weights: vec![WeightTier {
                    weight: "1kg".into(),
                    label: "Serves 8-10".into(),
                    price: Money::from_major(1000),
                }],
                is_active: true,
            })
            .await
            .expect("Error creating product")
            .id;
        debug!("Created test shop at {url}");
        Self { db, config: test_config(), customer, other_customer, cake }
    }

    /// Sends the request to a freshly configured app and returns the status and body. Errors raised by middleware
    /// never become a response, so they are returned as the error message instead.
    pub async fn send(&self, req: TestRequest) -> Result<(StatusCode, String), String> {
        let app = App::new()
            .app_data(web::Data::new(CartApi::new(self.db.clone(), self.config.shipping)))
            .app_data(web::Data::new(OrderFlowApi::new(
                self.db.clone(),
                self.config.clone(),
                EventProducers::default(),
            )))
            .app_data(web::Data::new(LoyaltyApi::new(
                self.db.clone(),
                self.config.loyalty.clone(),
                EventProducers::default(),
            )))
            .app_data(web::Data::new(AdminKey::new(Secret::new(ADMIN_KEY.to_string()))))
            .configure(configure_routes::<SqliteDatabase>);
        let service = test::init_service(app).await;
        let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
        let status = res.status();
        let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
        Ok((status, body))
    }

    /// Like [`Self::send`], but the request is expected to produce a response, which is parsed as JSON.
    pub async fn send_json(&self, req: TestRequest) -> (StatusCode, Value) {
        let (status, body) = self.send(req).await.expect("Request failed");
        let value = serde_json::from_str(&body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"));
        (status, value)
    }

    pub async fn add_cake_to_cart(&self, user_id: i64, quantity: u32) {
        let req = as_customer(TestRequest::post().uri("/api/cart/items"), user_id)
            .set_json(json!({ "product_id": self.cake, "quantity": quantity, "weight": "1kg" }));
        let (status, _) = self.send_json(req).await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Puts one cake in the customer's cart and checks out with standard delivery. Returns the checkout result.
    pub async fn place_order(&self, payment_method: &str) -> Value {
        self.add_cake_to_cart(self.customer, 1).await;
        let req = as_customer(TestRequest::post().uri("/api/checkout"), self.customer)
            .set_json(checkout_body("standard", payment_method));
        let (status, body) = self.send_json(req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub fn as_customer(req: TestRequest, user_id: i64) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string()))
}

pub fn as_admin(req: TestRequest) -> TestRequest {
    req.insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
}

pub fn checkout_body(delivery_type: &str, payment_method: &str) -> Value {
    json!({
        "payment_method": payment_method,
        "delivery": {
            "delivery_type": delivery_type,
            "recipient_name": "Alice Perera",
            "phone": "0771234567",
            "address": "12 Galle Road, Colombo 03"
        },
        "schedule": {
            "date": (Utc::now() + Duration::days(3)).to_rfc3339(),
            "time_slot": "10:00-12:00"
        }
    })
}

/// A gateway notification for the given transaction, signed with the test secret.
pub fn signed_notification(transaction_uuid: &str, status: &str, amount: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("transaction_uuid".to_string(), transaction_uuid.to_string());
    fields.insert("status".to_string(), status.to_string());
    fields.insert("amount".to_string(), amount.to_string());
    fields.insert("gateway_reference".to_string(), "GW-REF-7731".to_string());
    fields.insert(SIGNED_FIELD_NAMES.to_string(), "transaction_uuid,status,amount,gateway_reference".to_string());
    let signature = sign_fields(&fields, GATEWAY_SECRET).expect("Could not sign notification");
    fields.insert("signature".to_string(), signature);
    fields
}

pub fn test_config() -> EngineConfig {
    let gateway = GatewayConfig {
        access_key: "endpoint-access-key".into(),
        profile_id: "endpoint-profile".into(),
        secret_key: Secret::new(GATEWAY_SECRET.to_string()),
        success_url: "https://cakes.example.com/payment/success".into(),
        failure_url: "https://cakes.example.com/payment/failed".into(),
        notify_url: "https://cakes.example.com/payments/notify".into(),
        ..Default::default()
    };
    EngineConfig::new(ShippingRates::default(), LoyaltyConfig::default(), gateway)
}
