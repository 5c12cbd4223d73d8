/// `/api/v1/store` handlers.

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
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub logo_url: String,
    #[serde(skip_serializing)]
    pub logo_public_id: String,
    pub company_id: Uuid,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store row joined with its company and creator names for admin listings.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreWithNames {
    pub id: Uuid,
    pub name: String,
    pub logo_url: String,
    pub company_id: Uuid,
    pub company_name: Option<String>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreOption {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    pub company_id: Option<Uuid>,
}

pub async fn create_store(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    body: web::Json<CreateStoreRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;
    let company_id = body
        .company_id
        .or(caller.company_id)
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let store = sqlx::query_as::<_, Store>(
        "INSERT INTO stores (id, name, company_id, created_by) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(company_id)
    .bind(caller.id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict("Store with this name already exists".to_string())
        }
        other => other,
    })?;

    Ok(response::created(store, "Store created successfully"))
}

#[derive(Deserialize)]
pub struct UpdateStoreRequest {
    pub name: String,
}

pub async fn update_store(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStoreRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;

    let store = sqlx::query_as::<_, Store>(
        "UPDATE stores SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .bind(&name)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Store does not exist".to_string()))?;

    Ok(response::ok(store, "Store updated successfully"))
}

pub async fn get_stores(
    pool: web::Data<PgPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let stores = sqlx::query_as::<_, Store>(
        "SELECT * FROM stores ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stores")
        .fetch_one(pool.get_ref())
        .await?;

    let envelope = page_envelope("stores", "totalStores", stores, total, &query)?;
    Ok(response::ok(envelope, "Stores fetched successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCompanyScope {
    pub company_id: Option<Uuid>,
}

pub async fn get_stores_by_company(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    query: web::Query<PageQuery>,
    body: Option<web::Json<StoreCompanyScope>>,
) -> Result<HttpResponse, AppError> {
    let company_id = body
        .and_then(|b| b.into_inner().company_id)
        .or(caller.company_id)
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let stores = sqlx::query_as::<_, StoreWithNames>(
        "SELECT s.id, s.name, s.logo_url, s.company_id, \
                c.name AS company_name, a.name AS created_by_name, \
                s.created_at, s.updated_at \
         FROM stores s \
         LEFT JOIN companies c ON c.id = s.company_id \
         LEFT JOIN accounts a ON a.id = s.created_by \
         WHERE s.company_id = $1 \
         ORDER BY s.created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(company_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stores WHERE company_id = $1")
        .bind(company_id)
        .fetch_one(pool.get_ref())
        .await?;

    let (all_store_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stores")
        .fetch_one(pool.get_ref())
        .await?;

    let mut envelope = page_envelope("stores", "totalStores", stores, total, &query)?;
    if let Some(map) = envelope.as_object_mut() {
        map.insert("allStoreCount".to_string(), json!(all_store_count));
    }
    Ok(response::ok(envelope, "Stores fetched successfully"))
}

pub async fn get_store_by_id(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Store does not exist".to_string()))?;

    Ok(response::ok(store, "Store fetched successfully"))
}

pub async fn delete_store(
    pool: web::Data<PgPool>,
    media_client: web::Data<MediaClient>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let store = sqlx::query_as::<_, Store>("DELETE FROM stores WHERE id = $1 RETURNING *")
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Store does not exist".to_string()))?;

    destroy_in_background(&media_client, store.logo_public_id.clone());

    Ok(response::ok(json!({}), "Store deleted successfully"))
}

pub async fn update_store_logo(
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

    let store_id = path.into_inner();
    let previous = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
        .bind(store_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Store does not exist".to_string()))?;

    let asset = media_client
        .upload(&file.file_name, file.bytes.clone(), "store-logos")
        .await
        .map_err(AppError::Internal)?;

    let store = sqlx::query_as::<_, Store>(
        "UPDATE stores SET logo_url = $2, logo_public_id = $3, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(store_id)
    .bind(&asset.url)
    .bind(&asset.public_id)
    .fetch_one(pool.get_ref())
    .await?;

    destroy_in_background(&media_client, previous.logo_public_id.clone());

    Ok(response::ok(store, "Store logo updated successfully"))
}

/// Slim id+name list scoped to the caller's company.
pub async fn get_store_options(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
) -> Result<HttpResponse, AppError> {
    let company_id = caller
        .company_id
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let options = sqlx::query_as::<_, StoreOption>(
        "SELECT id, name FROM stores WHERE company_id = $1 ORDER BY name",
    )
    .bind(company_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(response::ok(options, "Store options fetched successfully"))
}
