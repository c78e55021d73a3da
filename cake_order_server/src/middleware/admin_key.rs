//! Admin key middleware for the cake order server.
//!
//! Routes declared with `requires admin` in the [`crate::route`] macro are wrapped with this middleware. It checks the
//! `x-cake-admin-key` header against the [`AdminKey`] stored in the app data. If the key is missing or wrong, a 403
//! Forbidden response is returned and the route handler never runs.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::warn;

use crate::{
    auth::{AdminKey, ADMIN_KEY_HEADER},
    errors::{AuthError, ServerError},
};

#[derive(Default)]
pub struct AdminKeyMiddlewareFactory;

impl AdminKeyMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminKeyMiddlewareService { service: Rc::new(service) })
    }
}

pub struct AdminKeyMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let provided = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
            let allowed = match req.app_data::<web::Data<AdminKey>>() {
                Some(key) => key.matches(provided),
                None => {
                    warn!("💻️ No admin key has been configured. Admin routes are disabled.");
                    false
                },
            };
            if allowed {
                service.call(req).await
            } else {
                warn!("💻️ Rejected admin request to {} from {:?}", req.path(), req.connection_info().peer_addr());
                Err(ServerError::AuthenticationError(AuthError::InvalidAdminKey).into())
            }
        })
    }
}
