/// Authentication middleware.
///
/// Accepts the access token from the `accessToken` cookie or a Bearer
/// `Authorization` header, verifies it, loads the account, and stores the
/// public projection in request extensions for handlers and the role gate.

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, HttpMessage};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::account_store;
use crate::auth::verify_access_token;
use crate::configuration::AuthSettings;
use crate::error::AppError;

pub struct AuthGate {
    settings: AuthSettings,
}

impl AuthGate {
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateMiddleware {
            service: Rc::new(service),
            settings: self.settings.clone(),
        }))
    }
}

pub struct AuthGateMiddleware<S> {
    service: Rc<S>,
    settings: AuthSettings,
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie("accessToken") {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

impl<S, B> Service<ServiceRequest> for AuthGateMiddleware<S>
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
        let settings = self.settings.clone();

        Box::pin(async move {
            let token = extract_token(&req)
                .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

            let claims = verify_access_token(&token, &settings)?;
            let account_id = claims.account_id()?;

            let pool = req
                .app_data::<web::Data<PgPool>>()
                .ok_or_else(|| AppError::Internal("database pool not configured".to_string()))?
                .clone();

            // The token may outlive the account it names.
            let account = account_store::find_public_by_id(&pool, &account_id)
                .await?
                .ok_or_else(|| {
                    AppError::Unauthorized("Invalid access token".to_string())
                })?;

            req.extensions_mut().insert(account);
            service.call(req).await
        })
    }
}
