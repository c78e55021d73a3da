//! Cake Order Engine
//!
//! The cake order engine holds the core logic of the online cake shop: carts, checkout, the order fulfilment state
//! machine, card-gateway payment reconciliation, and the sweet points loyalty programme. It has no HTTP surface of its
//! own; the order server exposes it over a REST API.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend in [`mod@sqlite`]). The engine APIs only talk to storage through
//!    the backend traits. The data types stored in the database are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@cake_api`]). This is where the business rules live: what a valid cart is, which order status
//!    changes are allowed, when a payment notification can be trusted, and how many points an order earns.
//!
//! The engine also emits events when orders are created, paid or change status, and when points are awarded. Hooks can
//! be registered for these events (see [`mod@events`]) to send notifications or update other systems.
pub mod cake_api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use cake_api::{
    cart_api::CartApi,
    cart_objects,
    engine_config::{EngineConfig, GatewayConfig, LoyaltyConfig, Milestone, RewardTier, ShippingRates},
    errors::{CartApiError, ErrorKind, LoyaltyApiError, OrderFlowError},
    loyalty_api::LoyaltyApi,
    loyalty_objects,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_gateway::PaymentGateway,
    payment_objects,
};
pub use events::{EventHandlers, EventHooks, EventProducers};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use traits::OrderStoreDatabase;
