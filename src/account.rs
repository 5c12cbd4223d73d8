/// Account entity and its client-facing projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed role tier. Stored as the `account_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Superadmin,
    Admin,
    User,
}

/// How the account authenticates. Password login is rejected for
/// SSO-registered accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "login_method")]
pub enum LoginMethod {
    #[sqlx(rename = "EMAIL_PASSWORD")]
    #[serde(rename = "EMAIL_PASSWORD")]
    EmailPassword,
    #[sqlx(rename = "GOOGLE")]
    #[serde(rename = "GOOGLE")]
    Google,
}

impl LoginMethod {
    /// Lowercase label used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            LoginMethod::EmailPassword => "email_password",
            LoginMethod::Google => "google",
        }
    }
}

/// Full account row, including secret fields. Never serialized to clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub login_method: LoginMethod,
    pub company_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub avatar_url: String,
    pub avatar_public_id: String,
    pub is_email_verified: bool,
    pub refresh_token: Option<String>,
    pub forgot_password_token: Option<String>,
    pub forgot_password_expiry: Option<DateTime<Utc>>,
    pub email_verification_token: Option<String>,
    pub email_verification_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public-safe projection: password hash, refresh token and the hashed
/// single-use tokens are excluded.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub login_method: LoginMethod,
    pub company_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub avatar_url: String,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            phone_number: account.phone_number,
            role: account.role,
            login_method: account.login_method,
            company_id: account.company_id,
            store_id: account.store_id,
            avatar_url: account.avatar_url,
            is_email_verified: account.is_email_verified,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
