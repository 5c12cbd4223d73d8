/// `/api/v1/users` handlers: registration, login, session lifecycle,
/// verification/reset tokens, and account administration.

use actix_multipart::Multipart;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::{LoginMethod, PublicAccount, Role};
use crate::account_store::{self, NewAccount};
use crate::auth::{
    generate_temporary_password, hash_password, hash_token, issue_access_token,
    issue_refresh_token, verify_password, verify_refresh_token, TemporaryToken,
};
use crate::configuration::AuthSettings;
use crate::email_client::{send_in_background, EmailClient};
use crate::error::AppError;
use crate::media_client::{destroy_in_background, MediaClient};
use crate::pagination::{page_envelope, PageQuery};
use crate::response;
use crate::routes::uploads::collect_form;

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: i64,
    settings: &AuthSettings,
) -> Cookie<'static> {
    let same_site = if settings.secure_cookies {
        SameSite::None
    } else {
        SameSite::Lax
    };
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(same_site)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

fn expired_cookie(name: &'static str, settings: &AuthSettings) -> Cookie<'static> {
    session_cookie(name, String::new(), 0, settings)
}

fn wrong_login_method(method: LoginMethod) -> AppError {
    AppError::InvalidState(format!(
        "You have previously registered using {}. Please use the {} login option to access your account.",
        method.label(),
        method.label()
    ))
}

fn verification_link(request: &HttpRequest, clear_token: &str) -> String {
    let info = request.connection_info();
    format!(
        "{}://{}/api/v1/users/verify-email/{}",
        info.scheme(),
        info.host(),
        clear_token
    )
}

fn reset_link(request: &HttpRequest, clear_token: &str) -> String {
    let info = request.connection_info();
    format!(
        "{}://{}/api/v1/users/reset-password/{}",
        info.scheme(),
        info.host(),
        clear_token
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
}

pub async fn register(
    request: HttpRequest,
    pool: web::Data<PgPool>,
    settings: web::Data<AuthSettings>,
    email_client: web::Data<EmailClient>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;
    let email = crate::validators::is_valid_email(&body.email)?;
    let phone_number = body
        .phone_number
        .as_deref()
        .map(crate::validators::is_valid_phone_number)
        .transpose()?;
    if body.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }

    let existing =
        account_store::find_by_identifier(&pool, Some(&email), phone_number.as_deref()).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "User with email or phone number already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&body.password)?;
    let account = account_store::insert(
        &pool,
        &NewAccount {
            name,
            email,
            phone_number,
            password_hash,
            // Self-serve registration creates a tenant owner.
            role: Role::Superadmin,
            login_method: LoginMethod::EmailPassword,
            company_id: None,
            store_id: None,
            is_email_verified: false,
        },
    )
    .await?;

    let token = TemporaryToken::issue(Duration::minutes(settings.temporary_token_expiry_minutes));
    account_store::set_email_verification_token(&pool, &account.id, &token.hashed, token.expires_at)
        .await?;

    let link = verification_link(&request, &token.clear);
    send_in_background(
        &email_client,
        account.email.clone(),
        "Verify your email".to_string(),
        format!(
            "<p>Hi {},</p><p>Please verify your email by clicking <a href=\"{}\">this link</a>. The link expires in {} minutes.</p>",
            account.name, link, settings.temporary_token_expiry_minutes
        ),
    );

    Ok(response::created(
        PublicAccount::from(account),
        "Users registered successfully and verification email has been sent on your email.",
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
}

pub async fn login(
    pool: web::Data<PgPool>,
    settings: web::Data<AuthSettings>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    if body.email.is_none() && body.phone_number.is_none() {
        return Err(AppError::Validation(
            "email or phone number is required".to_string(),
        ));
    }

    let account = account_store::find_by_identifier(
        &pool,
        body.email.as_deref(),
        body.phone_number.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if account.login_method != LoginMethod::EmailPassword {
        return Err(wrong_login_method(account.login_method));
    }

    if !verify_password(&body.password, &account.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid user credentials".to_string(),
        ));
    }

    let access_token = issue_access_token(&account, &settings)?;
    let refresh_token = issue_refresh_token(&account.id, &settings)?;
    account_store::store_refresh_token(&pool, &account.id, Some(&refresh_token)).await?;

    let body = json!({
        "user": PublicAccount::from(account),
        "accessToken": access_token.clone(),
        "refreshToken": refresh_token.clone(),
    });
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            "accessToken",
            access_token,
            settings.access_token_expiry,
            &settings,
        ))
        .cookie(session_cookie(
            "refreshToken",
            refresh_token,
            settings.refresh_token_expiry,
            &settings,
        ))
        .json(crate::response::ApiResponse::new(
            200,
            body,
            "User logged in successfully",
        )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

pub async fn refresh_token(
    request: HttpRequest,
    pool: web::Data<PgPool>,
    settings: web::Data<AuthSettings>,
    body: Option<web::Json<RefreshRequest>>,
) -> Result<HttpResponse, AppError> {
    let presented = request
        .cookie("refreshToken")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let claims = verify_refresh_token(&presented, &settings)?;
    let account_id = claims.account_id()?;

    let account = account_store::find_by_id(&pool, &account_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    // A rotated-out or already-redeemed token no longer matches the slot.
    if account.refresh_token.as_deref() != Some(presented.as_str()) {
        return Err(AppError::Unauthorized(
            "Refresh token is expired or used".to_string(),
        ));
    }

    let access_token = issue_access_token(&account, &settings)?;
    let new_refresh_token = issue_refresh_token(&account.id, &settings)?;
    account_store::store_refresh_token(&pool, &account.id, Some(&new_refresh_token)).await?;

    let body = json!({
        "accessToken": access_token.clone(),
        "refreshToken": new_refresh_token.clone(),
    });
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            "accessToken",
            access_token,
            settings.access_token_expiry,
            &settings,
        ))
        .cookie(session_cookie(
            "refreshToken",
            new_refresh_token,
            settings.refresh_token_expiry,
            &settings,
        ))
        .json(crate::response::ApiResponse::new(
            200,
            body,
            "Access token refreshed",
        )))
}

pub async fn logout(
    pool: web::Data<PgPool>,
    settings: web::Data<AuthSettings>,
    account: web::ReqData<PublicAccount>,
) -> Result<HttpResponse, AppError> {
    account_store::store_refresh_token(&pool, &account.id, None).await?;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie("accessToken", &settings))
        .cookie(expired_cookie("refreshToken", &settings))
        .json(crate::response::ApiResponse::new(
            200,
            json!({}),
            "User logged out",
        )))
}

pub async fn verify_email(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let presented = path.into_inner();
    if presented.trim().is_empty() {
        return Err(AppError::Validation(
            "Email verification token is missing".to_string(),
        ));
    }

    let redeemed = account_store::redeem_email_verification(&pool, &hash_token(&presented))
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    tracing::info!(account_id = %redeemed, "email verified");
    Ok(response::ok(
        json!({ "isEmailVerified": true }),
        "Email is verified",
    ))
}

pub async fn resend_email_verification(
    request: HttpRequest,
    pool: web::Data<PgPool>,
    settings: web::Data<AuthSettings>,
    email_client: web::Data<EmailClient>,
    account: web::ReqData<PublicAccount>,
) -> Result<HttpResponse, AppError> {
    let account = account_store::find_by_id(&pool, &account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if account.is_email_verified {
        return Err(AppError::Conflict("Email is already verified".to_string()));
    }

    let token = TemporaryToken::issue(Duration::minutes(settings.temporary_token_expiry_minutes));
    account_store::set_email_verification_token(&pool, &account.id, &token.hashed, token.expires_at)
        .await?;

    let link = verification_link(&request, &token.clear);
    send_in_background(
        &email_client,
        account.email.clone(),
        "Verify your email".to_string(),
        format!(
            "<p>Hi {},</p><p>Please verify your email by clicking <a href=\"{}\">this link</a>.</p>",
            account.name, link
        ),
    );

    Ok(response::ok(json!({}), "Mail has been sent to your mail ID"))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    request: HttpRequest,
    pool: web::Data<PgPool>,
    settings: web::Data<AuthSettings>,
    email_client: web::Data<EmailClient>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let email = crate::validators::is_valid_email(&body.email)?;

    let account = account_store::find_by_email(&pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !account.is_email_verified {
        return Err(AppError::NotFound(
            "Please Verify Your email First".to_string(),
        ));
    }
    if account.login_method != LoginMethod::EmailPassword {
        return Err(wrong_login_method(account.login_method));
    }

    let token = TemporaryToken::issue(Duration::minutes(settings.temporary_token_expiry_minutes));
    account_store::set_password_reset_token(&pool, &account.id, &token.hashed, token.expires_at)
        .await?;

    let link = reset_link(&request, &token.clear);
    send_in_background(
        &email_client,
        account.email.clone(),
        "Reset your password".to_string(),
        format!(
            "<p>Hi {},</p><p>You can reset your password by clicking <a href=\"{}\">this link</a>. The link expires in {} minutes.</p>",
            account.name, link, settings.temporary_token_expiry_minutes
        ),
    );

    Ok(response::ok(
        json!({}),
        "Password reset mail has been sent on your mail id",
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

pub async fn reset_password(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let presented = path.into_inner();
    if body.new_password.is_empty() {
        return Err(AppError::Validation("new password is required".to_string()));
    }

    let new_hash = hash_password(&body.new_password)?;
    let redeemed =
        account_store::redeem_password_reset(&pool, &hash_token(&presented), &new_hash)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

    tracing::info!(account_id = %redeemed, "password reset");
    Ok(response::ok(json!({}), "Password reset successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    if body.new_password.is_empty() {
        return Err(AppError::Validation("new password is required".to_string()));
    }

    let account = account_store::find_by_id(&pool, &caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !verify_password(&body.old_password, &account.password_hash)? {
        return Err(AppError::InvalidState("Invalid old password".to_string()));
    }

    let new_hash = hash_password(&body.new_password)?;
    account_store::set_password(&pool, &account.id, &new_hash).await?;

    Ok(response::ok(json!({}), "Password changed successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub new_password: String,
}

pub async fn change_password_directly(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<SetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    if body.new_password.is_empty() {
        return Err(AppError::Validation("new password is required".to_string()));
    }

    let target = path.into_inner();
    account_store::find_by_id(&pool, &target)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    let new_hash = hash_password(&body.new_password)?;
    account_store::set_password(&pool, &target, &new_hash).await?;

    Ok(response::ok(json!({}), "Password changed successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStaffRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub company_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
}

pub async fn register_user_staff(
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    caller: web::ReqData<PublicAccount>,
    body: web::Json<RegisterStaffRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;
    let email = crate::validators::is_valid_email(&body.email)?;
    let phone_number = body
        .phone_number
        .as_deref()
        .map(crate::validators::is_valid_phone_number)
        .transpose()?;

    let company_id = body
        .company_id
        .or(caller.company_id)
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let existing =
        account_store::find_by_identifier(&pool, Some(&email), phone_number.as_deref()).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "User with email or phone number already exists".to_string(),
        ));
    }

    let password = body
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(generate_temporary_password);
    let password_hash = hash_password(&password)?;

    let account = account_store::insert(
        &pool,
        &NewAccount {
            name,
            email,
            phone_number,
            password_hash,
            role: Role::User,
            login_method: LoginMethod::EmailPassword,
            company_id: Some(company_id),
            store_id: body.store_id,
            // Provisioned by an administrator, no verification round trip.
            is_email_verified: true,
        },
    )
    .await?;

    send_in_background(
        &email_client,
        account.email.clone(),
        "Your account has been created".to_string(),
        format!(
            "<p>Hi {},</p><p>An account has been created for you. Sign in with the password <strong>{}</strong> and change it after your first login.</p>",
            account.name, password
        ),
    );

    Ok(response::created(
        PublicAccount::from(account),
        "User created successfully",
    ))
}

pub async fn current_user(account: web::ReqData<PublicAccount>) -> HttpResponse {
    response::ok(
        account.into_inner(),
        "Current user fetched successfully",
    )
}

pub async fn get_users(
    pool: web::Data<PgPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let (users, total) = account_store::list_public(&pool, &query).await?;
    let envelope = page_envelope("users", "totalUsers", users, total, &query)?;
    Ok(response::ok(envelope, "Users fetched successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyScope {
    pub company_id: Option<Uuid>,
}

pub async fn get_users_by_company(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    query: web::Query<PageQuery>,
    body: Option<web::Json<CompanyScope>>,
) -> Result<HttpResponse, AppError> {
    let company_id = body
        .and_then(|b| b.into_inner().company_id)
        .or(caller.company_id)
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let (users, total) =
        account_store::list_public_by_company(&pool, &company_id, &query).await?;
    if users.is_empty() {
        return Err(AppError::NotFound("Users are not available".to_string()));
    }

    let all_user_count = account_store::count_all(&pool).await?;
    let mut envelope = page_envelope("users", "totalUsers", users, total, &query)?;
    if let Some(map) = envelope.as_object_mut() {
        map.insert("allUserCount".to_string(), json!(all_user_count));
    }
    Ok(response::ok(envelope, "Users fetched successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

pub async fn update_user(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;
    let email = crate::validators::is_valid_email(&body.email)?;
    let phone_number = body
        .phone_number
        .as_deref()
        .map(crate::validators::is_valid_phone_number)
        .transpose()?;

    let updated = account_store::update_profile(
        &pool,
        &path.into_inner(),
        &name,
        &email,
        phone_number.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    Ok(response::ok(updated, "User updated successfully"))
}

#[derive(Deserialize)]
pub struct AssignRoleRequest {
    pub role: Role,
}

pub async fn assign_role(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<AssignRoleRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = account_store::set_role(&pool, &path.into_inner(), body.role).await?;
    if !updated {
        return Err(AppError::NotFound("User does not exist".to_string()));
    }
    Ok(response::ok(json!({}), "Role changed for the user"))
}

pub async fn update_avatar(
    pool: web::Data<PgPool>,
    media_client: web::Data<MediaClient>,
    caller: web::ReqData<PublicAccount>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = collect_form(payload).await?;
    let file = form
        .files
        .first()
        .ok_or_else(|| AppError::Validation("Avatar file is missing".to_string()))?;

    let previous = account_store::find_by_id(&pool, &caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    let asset = media_client
        .upload(&file.file_name, file.bytes.clone(), "avatars")
        .await
        .map_err(AppError::Internal)?;

    let updated = account_store::set_avatar(&pool, &caller.id, &asset)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    destroy_in_background(&media_client, previous.avatar_public_id);

    Ok(response::ok(updated, "Avatar updated successfully"))
}
