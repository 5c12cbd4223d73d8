/// Issuing and verifying the access/refresh token pair.
///
/// The two kinds are signed with distinct secrets so one can never be
/// presented in place of the other. Verification is fail-closed: any
/// decode failure on the refresh path collapses to a single 401.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use crate::account::Account;
use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::AuthSettings;
use crate::error::AppError;
use uuid::Uuid;

pub fn issue_access_token(account: &Account, settings: &AuthSettings) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: account.id.to_string(),
        email: account.email.clone(),
        role: account.role,
        exp: now + settings.access_token_expiry,
        iat: now,
        iss: settings.issuer.clone(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.access_token_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign access token: {}", e)))
}

pub fn issue_refresh_token(account_id: &Uuid, settings: &AuthSettings) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = RefreshClaims {
        sub: account_id.to_string(),
        exp: now + settings.refresh_token_expiry,
        iat: now,
        iss: settings.issuer.clone(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.refresh_token_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign refresh token: {}", e)))
}

/// Decodes an access token. Expiry is surfaced as a distinct error so
/// clients know to refresh instead of re-authenticating.
pub fn verify_access_token(
    token: &str,
    settings: &AuthSettings,
) -> Result<AccessClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&settings.issuer]);

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(settings.access_token_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::Unauthorized("Invalid access token".to_string()),
    })
}

/// Decodes a refresh token. All failure modes map to the same 401.
pub fn verify_refresh_token(
    token: &str,
    settings: &AuthSettings,
) -> Result<RefreshClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&settings.issuer]);

    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(settings.refresh_token_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
}
