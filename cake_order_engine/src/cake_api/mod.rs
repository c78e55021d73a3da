//! # Cake order engine public API
//!
//! The `cake_api` module exposes the programmatic API for the cake shop. The API is modular, so that clients can pick
//! the parts they need.
//!
//! * [`cart_api`] manages each customer's cart: adding and removing cakes, changing quantities, and attaching a
//!   promo code.
//! * [`order_flow_api`] is the primary API for the life of an order. It turns carts into orders, drives the fulfilment
//!   state machine, and reconciles payment notifications from the card gateway.
//! * [`loyalty_api`] awards sweet points for delivered orders and lets customers trade points for coupons.
//! * [`payment_gateway`] builds and verifies the signed messages exchanged with the hosted payment page.
//!
//! The other submodules are the request and response types for these APIs, configuration, and errors.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits it needs.
//!
//! ```rust,ignore
//! use cake_order_engine::{EngineConfig, EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/cake_store.db", 5).await?;
//! let api = OrderFlowApi::new(db, EngineConfig::default(), EventProducers::default());
//! let result = api.checkout(user_id, checkout_request).await?;
//! ```

pub mod cart_api;
pub mod cart_objects;
pub mod engine_config;
pub mod errors;
pub mod loyalty_api;
pub mod loyalty_objects;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_gateway;
pub mod payment_objects;
