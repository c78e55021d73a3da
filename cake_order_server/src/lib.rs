//! # Cake order server
//! This crate hosts the HTTP surface of the cake shop. It is responsible for:
//! * Serving the customer cart, checkout, order and loyalty endpoints.
//! * Receiving server-to-server payment notifications from the card gateway.
//! * Letting bakery staff move orders through fulfilment and record refunds.
//!
//! All business rules live in [`cake_order_engine`]; the handlers here only extract the caller and the request body
//! and hand them to the engine.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Customer routes. The caller is identified by the `x-cake-user-id` header.
//! * `/payments/notify`: The gateway notification callback. Authenticated by the notification signature only.
//! * `/admin/...`: Staff routes. Require the `x-cake-admin-key` header.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
