/// `/api/v1/company` handlers.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::PublicAccount;
use crate::error::AppError;
use crate::media_client::{destroy_in_background, MediaClient};
use crate::pagination::{page_envelope, PageQuery};
use crate::response;
use crate::routes::uploads::collect_form;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub logo_url: String,
    #[serde(skip_serializing)]
    pub logo_public_id: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOption {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CompanyNameRequest {
    pub name: String,
}

pub async fn create_company(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    body: web::Json<CompanyNameRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;

    let company = sqlx::query_as::<_, Company>(
        "INSERT INTO companies (id, name, created_by) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(caller.id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict("Company with this name already exists".to_string())
        }
        other => other,
    })?;

    Ok(response::created(company, "Company created successfully"))
}

pub async fn update_company(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<CompanyNameRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;

    let company = sqlx::query_as::<_, Company>(
        "UPDATE companies SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .bind(&name)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Company does not exist".to_string()))?;

    Ok(response::ok(company, "Company updated successfully"))
}

pub async fn get_companies(
    pool: web::Data<PgPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let companies = sqlx::query_as::<_, Company>(
        "SELECT * FROM companies ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM companies")
        .fetch_one(pool.get_ref())
        .await?;

    let envelope = page_envelope("companies", "totalCompanies", companies, total, &query)?;
    Ok(response::ok(envelope, "Companies fetched successfully"))
}

pub async fn get_company_by_id(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Company does not exist".to_string()))?;

    Ok(response::ok(company, "Company fetched successfully"))
}

pub async fn delete_company(
    pool: web::Data<PgPool>,
    media_client: web::Data<MediaClient>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let company = sqlx::query_as::<_, Company>(
        "DELETE FROM companies WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Company does not exist".to_string()))?;

    destroy_in_background(&media_client, company.logo_public_id.clone());

    Ok(response::ok(json!({}), "Company deleted successfully"))
}

pub async fn update_company_logo(
    pool: web::Data<PgPool>,
    media_client: web::Data<MediaClient>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = collect_form(payload).await?;
    let file = form
        .files
        .first()
        .ok_or_else(|| AppError::Validation("Logo file is missing".to_string()))?;

    let company_id = path.into_inner();
    let previous = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Company does not exist".to_string()))?;

    let asset = media_client
        .upload(&file.file_name, file.bytes.clone(), "company-logos")
        .await
        .map_err(AppError::Internal)?;

    let company = sqlx::query_as::<_, Company>(
        "UPDATE companies SET logo_url = $2, logo_public_id = $3, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(company_id)
    .bind(&asset.url)
    .bind(&asset.public_id)
    .fetch_one(pool.get_ref())
    .await?;

    destroy_in_background(&media_client, previous.logo_public_id.clone());

    Ok(response::ok(company, "Company logo updated successfully"))
}

/// Slim id+name list for dropdowns. Affiliated callers only see their own
/// company; unaffiliated administrators see all.
pub async fn get_company_options(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
) -> Result<HttpResponse, AppError> {
    let options = match caller.company_id {
        Some(company_id) => {
            sqlx::query_as::<_, CompanyOption>(
                "SELECT id, name FROM companies WHERE id = $1",
            )
            .bind(company_id)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => {
            sqlx::query_as::<_, CompanyOption>(
                "SELECT id, name FROM companies ORDER BY name",
            )
            .fetch_all(pool.get_ref())
            .await?
        }
    };

    Ok(response::ok(options, "Company options fetched successfully"))
}
