/// Persistence layer for accounts.
///
/// All session-state mutations live here so the single-slot refresh token
/// and the paired token/expiry columns are always written together.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::{Account, LoginMethod, PublicAccount, Role};
use crate::error::AppError;
use crate::media_client::StoredAsset;
use crate::pagination::PageQuery;

/// Columns backing [`PublicAccount`]; secret columns are never selected
/// on public paths.
const PUBLIC_COLUMNS: &str = "id, name, email, phone_number, role, login_method, \
     company_id, store_id, avatar_url, is_email_verified, created_at, updated_at";

pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub login_method: LoginMethod,
    pub company_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub is_email_verified: bool,
}

pub async fn insert(pool: &PgPool, new_account: &NewAccount) -> Result<Account, AppError> {
    let account = sqlx::query_as::<_, Account>(
        "INSERT INTO accounts \
         (id, name, email, phone_number, password_hash, role, login_method, \
          company_id, store_id, is_email_verified) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new_account.name)
    .bind(&new_account.email)
    .bind(&new_account.phone_number)
    .bind(&new_account.password_hash)
    .bind(new_account.role)
    .bind(new_account.login_method)
    .bind(new_account.company_id)
    .bind(new_account.store_id)
    .bind(new_account.is_email_verified)
    .fetch_one(pool)
    .await?;
    Ok(account)
}

/// Looks an account up by email or phone number, whichever is present.
pub async fn find_by_identifier(
    pool: &PgPool,
    email: Option<&str>,
    phone_number: Option<&str>,
) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE email = $1 OR phone_number = $2",
    )
    .bind(email)
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;
    Ok(account)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

pub async fn find_by_id(pool: &PgPool, id: &Uuid) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

pub async fn find_public_by_id(
    pool: &PgPool,
    id: &Uuid,
) -> Result<Option<PublicAccount>, AppError> {
    let account = sqlx::query_as::<_, PublicAccount>(&format!(
        "SELECT {} FROM accounts WHERE id = $1",
        PUBLIC_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(account)
}

/// Writes (or clears, with `None`) the single refresh-token slot.
/// Writing a new token invalidates whatever was there before.
pub async fn store_refresh_token(
    pool: &PgPool,
    id: &Uuid,
    refresh_token: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE accounts SET refresh_token = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(refresh_token)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_email_verification_token(
    pool: &PgPool,
    id: &Uuid,
    hashed: &str,
    expiry: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE accounts \
         SET email_verification_token = $2, email_verification_expiry = $3, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(hashed)
    .bind(expiry)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically redeems an email-verification token: the match, the expiry
/// check, the verified flag and the token clearing happen in one
/// statement, so a token can be used at most once.
pub async fn redeem_email_verification(
    pool: &PgPool,
    hashed: &str,
) -> Result<Option<Uuid>, AppError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "UPDATE accounts \
         SET is_email_verified = TRUE, \
             email_verification_token = NULL, email_verification_expiry = NULL, \
             updated_at = NOW() \
         WHERE email_verification_token = $1 AND email_verification_expiry > NOW() \
         RETURNING id",
    )
    .bind(hashed)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn set_password_reset_token(
    pool: &PgPool,
    id: &Uuid,
    hashed: &str,
    expiry: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE accounts \
         SET forgot_password_token = $2, forgot_password_expiry = $3, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(hashed)
    .bind(expiry)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically redeems a password-reset token and installs the new hash.
/// The refresh token is cleared in the same statement so live sessions
/// do not survive a reset.
pub async fn redeem_password_reset(
    pool: &PgPool,
    hashed: &str,
    new_password_hash: &str,
) -> Result<Option<Uuid>, AppError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "UPDATE accounts \
         SET password_hash = $2, refresh_token = NULL, \
             forgot_password_token = NULL, forgot_password_expiry = NULL, \
             updated_at = NOW() \
         WHERE forgot_password_token = $1 AND forgot_password_expiry > NOW() \
         RETURNING id",
    )
    .bind(hashed)
    .bind(new_password_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn set_password(
    pool: &PgPool,
    id: &Uuid,
    password_hash: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns false when no account matched.
pub async fn set_role(pool: &PgPool, id: &Uuid, role: Role) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE accounts SET role = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_profile(
    pool: &PgPool,
    id: &Uuid,
    name: &str,
    email: &str,
    phone_number: Option<&str>,
) -> Result<Option<PublicAccount>, AppError> {
    let account = sqlx::query_as::<_, PublicAccount>(&format!(
        "UPDATE accounts \
         SET name = $2, email = $3, phone_number = $4, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {}",
        PUBLIC_COLUMNS
    ))
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;
    Ok(account)
}

pub async fn set_avatar(
    pool: &PgPool,
    id: &Uuid,
    asset: &StoredAsset,
) -> Result<Option<PublicAccount>, AppError> {
    let account = sqlx::query_as::<_, PublicAccount>(&format!(
        "UPDATE accounts \
         SET avatar_url = $2, avatar_public_id = $3, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {}",
        PUBLIC_COLUMNS
    ))
    .bind(id)
    .bind(&asset.url)
    .bind(&asset.public_id)
    .fetch_optional(pool)
    .await?;
    Ok(account)
}

pub async fn list_public(
    pool: &PgPool,
    query: &PageQuery,
) -> Result<(Vec<PublicAccount>, i64), AppError> {
    let accounts = sqlx::query_as::<_, PublicAccount>(&format!(
        "SELECT {} FROM accounts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        PUBLIC_COLUMNS
    ))
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
        .fetch_one(pool)
        .await?;

    Ok((accounts, total))
}

pub async fn list_public_by_company(
    pool: &PgPool,
    company_id: &Uuid,
    query: &PageQuery,
) -> Result<(Vec<PublicAccount>, i64), AppError> {
    let accounts = sqlx::query_as::<_, PublicAccount>(&format!(
        "SELECT {} FROM accounts WHERE company_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        PUBLIC_COLUMNS
    ))
    .bind(company_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(pool)
            .await?;

    Ok((accounts, total))
}

pub async fn count_all(pool: &PgPool) -> Result<i64, AppError> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
        .fetch_one(pool)
        .await?;
    Ok(total)
}
