//! Caller identification.
//!
//! The server sits behind the storefront's session layer, which authenticates customers and forwards their user id in
//! the `x-cake-user-id` header. Admin routes are guarded separately by a shared key in the `x-cake-admin-key` header
//! (see [`crate::middleware::AdminKeyMiddlewareFactory`]).
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use cake_common::Secret;
use log::debug;

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "x-cake-user-id";
pub const ADMIN_KEY_HEADER: &str = "x-cake-admin-key";

/// The customer making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_from_request(req))
    }
}

fn caller_from_request(req: &HttpRequest) -> Result<Caller, ServerError> {
    let value = req.headers().get(USER_ID_HEADER).ok_or(AuthError::MissingIdentity)?;
    let value = value.to_str().map_err(|e| AuthError::InvalidIdentity(e.to_string()))?;
    let user_id = value.trim().parse::<i64>().map_err(|e| {
        debug!("💻️ Invalid user id header '{value}'. {e}");
        AuthError::InvalidIdentity(format!("'{value}' is not a user id"))
    })?;
    if user_id <= 0 {
        return Err(AuthError::InvalidIdentity(format!("'{value}' is not a user id")).into());
    }
    Ok(Caller { user_id })
}

/// The admin key the server was configured with. An empty key disables the admin routes entirely.
#[derive(Debug, Clone, Default)]
pub struct AdminKey(pub Secret<String>);

impl AdminKey {
    pub fn new(key: Secret<String>) -> Self {
        Self(key)
    }

    /// Compares the provided key against the configured one in constant time.
    pub fn matches(&self, provided: &str) -> bool {
        let expected = self.0.reveal().as_bytes();
        let provided = provided.as_bytes();
        if expected.is_empty() || expected.len() != provided.len() {
            return false;
        }
        expected.iter().zip(provided).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}
