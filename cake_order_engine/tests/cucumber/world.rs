use std::collections::{BTreeMap, HashMap};

use cake_common::Secret;
use cake_order_engine::{
    db_types::{Coupon, Order},
    helpers::{sign_fields, SIGNED_FIELD_NAMES},
    payment_objects::ReconciliationOutcome,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    CartApi,
    EngineConfig,
    EventProducers,
    GatewayConfig,
    LoyaltyConfig,
    OrderFlowApi,
    ShippingRates,
    SqliteDatabase,
};
use cucumber::World;
use log::*;

pub const GATEWAY_SECRET: &str = "cucumber-gateway-secret";

#[derive(Default, Debug, World)]
pub struct CakeWorld {
    pub system: Option<CakeShopSystem>,
    pub users: HashMap<String, i64>,
    pub products: HashMap<String, i64>,
    pub last_order: Option<Order>,
    pub previous_transaction: Option<String>,
    pub last_outcome: Option<ReconciliationOutcome>,
    pub last_error: Option<String>,
    pub last_coupon: Option<Coupon>,
}

#[derive(Debug)]
pub struct CakeShopSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub carts: CartApi<SqliteDatabase>,
    pub orders: OrderFlowApi<SqliteDatabase>,
}

impl CakeWorld {
    pub fn system(&self) -> &CakeShopSystem {
        self.system.as_ref().expect("Cake shop not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn carts(&self) -> &CartApi<SqliteDatabase> {
        &self.system().carts
    }

    pub fn orders(&self) -> &OrderFlowApi<SqliteDatabase> {
        &self.system().orders
    }

    pub fn user_id(&self, name: &str) -> i64 {
        *self.users.get(name).unwrap_or_else(|| panic!("No customer called {name}"))
    }

    pub fn product_id(&self, name: &str) -> i64 {
        *self.products.get(name).unwrap_or_else(|| panic!("No cake called {name}"))
    }

    pub fn last_order(&self) -> &Order {
        self.last_order.as_ref().expect("No order has been placed")
    }

    /// A notification for the last order's current transaction, signed the way the gateway signs them.
    pub fn signed_notification(&self, status: &str, amount: &str) -> BTreeMap<String, String> {
        let order = self.last_order();
        let txid = order.gateway_transaction_id.clone().expect("The order has no gateway transaction");
        let mut fields = BTreeMap::new();
        fields.insert("transaction_uuid".to_string(), txid);
        fields.insert("status".to_string(), status.to_string());
        fields.insert("amount".to_string(), amount.to_string());
        fields.insert("gateway_reference".to_string(), "GW-REF-0001".to_string());
        fields.insert(SIGNED_FIELD_NAMES.to_string(), "transaction_uuid,status,amount,gateway_reference".to_string());
        let signature = sign_fields(&fields, GATEWAY_SECRET).expect("Could not sign notification");
        fields.insert("signature".to_string(), signature);
        fields
    }
}

impl CakeShopSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 25).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let config = test_config();
        let carts = CartApi::new(db.clone(), config.shipping);
        let orders = OrderFlowApi::new(db.clone(), config, EventProducers::default());
        Self { db_path: url, db, carts, orders }
    }
}

pub fn test_config() -> EngineConfig {
    let gateway = GatewayConfig {
        access_key: "test-access-key".into(),
        profile_id: "test-profile".into(),
        secret_key: Secret::new(GATEWAY_SECRET.to_string()),
        success_url: "https://cakes.example.com/payment/success".into(),
        failure_url: "https://cakes.example.com/payment/failed".into(),
        notify_url: "https://cakes.example.com/api/payments/notify".into(),
        ..Default::default()
    };
    EngineConfig::new(ShippingRates::default(), LoyaltyConfig::default(), gateway)
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
