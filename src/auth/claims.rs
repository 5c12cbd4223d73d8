/// JWT claim sets for the two token kinds.
///
/// The access token carries identity and role so the middleware can gate
/// without a lookup on every request; the refresh token carries only the
/// account id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::Role;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account id.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
    }
}
