/// Access Token Middleware
///
/// Runs `AuthorizationGuard::authenticate` on every request of the wrapped
/// resource and injects the caller's `Identity` into request extensions.
/// Handlers read it back with `web::ReqData<Identity>`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::AuthorizationGuard;
use crate::error::AppError;

/// Middleware for routes that require a valid access token
pub struct RequireAuth {
    guard: AuthorizationGuard,
}

impl RequireAuth {
    pub fn new(guard: AuthorizationGuard) -> Self {
        Self { guard }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireAuthService {
            service: Rc::new(service),
            guard: self.guard.clone(),
        }))
    }
}

pub struct RequireAuthService<S> {
    service: Rc<S>,
    guard: AuthorizationGuard,
}

impl<S, B> Service<ServiceRequest> for RequireAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.guard.authenticate(req.headers()) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                tracing::debug!(user_id = %identity, "Access token validated");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let error: Error = AppError::Auth(e).into();
                Box::pin(async move { Err(error) })
            }
        }
    }
}
