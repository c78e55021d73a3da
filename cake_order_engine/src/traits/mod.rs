//! #  Storage backend contracts.
//!
//! This module defines the interface contracts that a storage *backend* must satisfy to run the cake order engine.
//! The engine APIs are generic over these traits and never touch SQL directly.
//!
//! * [`CatalogLookup`] is the read-only view of the product catalog used to validate carts and snapshot orders.
//! * [`CartManagement`] stores the single, mutable cart each customer has.
//! * [`OrderManagement`] stores orders, and exposes the conditional updates that the fulfilment state machine and
//!   payment reconciliation rely on.
//! * [`LoyaltyManagement`] stores the points ledger and the coupons bought with points.
//!
//! [`OrderStoreDatabase`] bundles all of them. It is implemented automatically for any type that implements the
//! four traits.
mod cart_management;
mod catalog_lookup;
mod loyalty_management;
mod order_management;

pub use cart_management::{CartManagement, CartStoreError};
pub use catalog_lookup::{CatalogError, CatalogLookup};
pub use loyalty_management::{LoyaltyManagement, LoyaltyStoreError};
pub use order_management::{OrderManagement, OrderStoreError};

/// Everything the engine needs from a storage backend.
pub trait OrderStoreDatabase: CatalogLookup + CartManagement + OrderManagement + LoyaltyManagement + Clone {}

impl<T> OrderStoreDatabase for T where T: CatalogLookup + CartManagement + OrderManagement + LoyaltyManagement + Clone {}
