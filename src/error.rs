/// Unified error handling for the service.
///
/// Every business-rule failure is raised as an `AppError` carrying an HTTP
/// status and message; the `ResponseError` impl serializes it once, at the
/// boundary, into the uniform error envelope
/// `{statusCode, code, message, errors[], success: false}`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::validators::ValidationError;

/// Closed error taxonomy. The boundary layer maps each variant to a status
/// code; handlers never build HTTP responses for failures themselves.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing input. 400.
    Validation(String),
    /// No matching account/resource. 404.
    NotFound(String),
    /// Missing/invalid/reused token or bad credentials. 401.
    Unauthorized(String),
    /// Access token past its expiry. 401 with a distinguishable code so
    /// clients know to refresh rather than re-login.
    TokenExpired,
    /// Single-use verification/reset token did not match or is past expiry.
    /// Answered with status 489.
    InvalidOrExpiredToken,
    /// Authenticated but role not permitted. 403.
    Forbidden(String),
    /// Duplicate email/phone/name, or a precondition conflict. 409.
    Conflict(String),
    /// Operation not valid for the account's current state
    /// (e.g. wrong login method). 400.
    InvalidState(String),
    /// Unexpected failure. 500; the message is logged, not exposed.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidState(msg) => write!(f, "{}", msg),
            AppError::TokenExpired => write!(f, "Access token has expired"),
            AppError::InvalidOrExpiredToken => write!(f, "Token is invalid or expired"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl AppError {
    /// Stable machine-readable code for client-side handling.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidOrExpiredToken => "TOKEN_INVALID_OR_EXPIRED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::Conflict(_)
            | AppError::InvalidState(_) => {
                tracing::warn!(code = self.code(), error = %self, "request rejected");
            }
            AppError::Unauthorized(_)
            | AppError::TokenExpired
            | AppError::InvalidOrExpiredToken
            | AppError::Forbidden(_) => {
                tracing::warn!(code = self.code(), error = %self, "authorization failure");
            }
            AppError::Internal(msg) => {
                tracing::error!(code = self.code(), error = %msg, "internal error");
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // 23505 = unique_violation
                if db_err.code().as_deref() == Some("23505") {
                    AppError::Conflict("Duplicate entry for a unique field".to_string())
                } else {
                    AppError::Internal(err.to_string())
                }
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// Uniform error envelope returned for every failure.
#[derive(Debug, serde::Serialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub code: String,
    pub message: String,
    pub errors: Vec<String>,
    pub success: bool,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::InvalidOrExpiredToken => {
                StatusCode::from_u16(489).unwrap_or(StatusCode::BAD_REQUEST)
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorEnvelope {
            status_code: status.as_u16(),
            code: self.code().to_string(),
            message: self.public_message(),
            errors: Vec::new(),
            success: false,
        })
    }
}
