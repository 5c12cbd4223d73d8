/// Role-based authorization middleware.
///
/// Runs after [`super::AuthGate`] and reads the account it placed in
/// request extensions; a request that skipped authentication fails here
/// too.

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures::future::LocalBoxFuture;

use crate::account::{PublicAccount, Role};
use crate::error::AppError;

pub struct RoleGate {
    allowed: Rc<Vec<Role>>,
}

impl RoleGate {
    pub fn allow(roles: &[Role]) -> Self {
        Self {
            allowed: Rc::new(roles.to_vec()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RoleGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGateMiddleware {
            service: Rc::new(service),
            allowed: Rc::clone(&self.allowed),
        }))
    }
}

pub struct RoleGateMiddleware<S> {
    service: Rc<S>,
    allowed: Rc<Vec<Role>>,
}

impl<S, B> Service<ServiceRequest> for RoleGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed = Rc::clone(&self.allowed);

        Box::pin(async move {
            let role = req
                .extensions()
                .get::<PublicAccount>()
                .map(|account| account.role);

            match role {
                None => {
                    Err(AppError::Unauthorized("Unauthorized request".to_string()).into())
                }
                Some(role) if !allowed.contains(&role) => Err(AppError::Forbidden(
                    "You are not allowed to perform this action".to_string(),
                )
                .into()),
                Some(_) => service.call(req).await,
            }
        })
    }
}
