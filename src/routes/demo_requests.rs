/// `/api/v1/demoRequest` handlers. Intake is public; everything else is
/// for administrators. Deletion is a soft-delete flag so the sales trail
/// survives.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::pagination::{page_envelope, PageQuery};
use crate::response;

const COMPANY_SIZES: &[&str] = &["1-10", "11-50", "51-200", "200+"];
const STATUSES: &[&str] = &[
    "pending",
    "contacted",
    "demo-scheduled",
    "demo-completed",
    "converted",
    "rejected",
];
const PRIORITIES: &[&str] = &["low", "medium", "high"];
const SOURCES: &[&str] = &["website", "referral", "social-media", "email-campaign", "other"];

fn validate_choice(
    value: &str,
    allowed: &[&str],
    field: &'static str,
) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        )))
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DemoRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company_name: String,
    pub company_size: String,
    pub audit_needs: String,
    pub status: String,
    pub priority: String,
    pub assigned_to: Option<Uuid>,
    pub notes: String,
    pub demo_scheduled_at: Option<DateTime<Utc>>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDemoRequest {
    pub name: String,
    pub email: String,
    pub company_name: String,
    pub company_size: String,
    pub audit_needs: Option<String>,
    pub source: Option<String>,
}

pub async fn create_demo_request(
    pool: web::Data<PgPool>,
    body: web::Json<CreateDemoRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;
    let email = crate::validators::is_valid_email(&body.email)?;
    let company_name = crate::validators::is_valid_name(&body.company_name)?;
    validate_choice(&body.company_size, COMPANY_SIZES, "companySize")?;
    let source = body.source.as_deref().unwrap_or("website");
    validate_choice(source, SOURCES, "source")?;

    let (existing,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM demo_requests WHERE email = $1 AND is_deleted = FALSE",
    )
    .bind(&email)
    .fetch_one(pool.get_ref())
    .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            "Demo request with this email already exists".to_string(),
        ));
    }

    let record = sqlx::query_as::<_, DemoRequest>(
        "INSERT INTO demo_requests \
         (id, name, email, company_name, company_size, audit_needs, source, follow_up_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&email)
    .bind(&company_name)
    .bind(&body.company_size)
    .bind(body.audit_needs.as_deref().unwrap_or(""))
    .bind(source)
    .bind(Utc::now() + Duration::days(3))
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::created(record, "Demo request submitted successfully"))
}

#[derive(Deserialize)]
pub struct DemoRequestListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

pub async fn get_demo_requests(
    pool: web::Data<PgPool>,
    query: web::Query<DemoRequestListQuery>,
) -> Result<HttpResponse, AppError> {
    if let Some(status) = query.status.as_deref() {
        validate_choice(status, STATUSES, "status")?;
    }
    if let Some(priority) = query.priority.as_deref() {
        validate_choice(priority, PRIORITIES, "priority")?;
    }

    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };

    let records = sqlx::query_as::<_, DemoRequest>(
        "SELECT * FROM demo_requests \
         WHERE is_deleted = FALSE \
           AND ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR priority = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(query.status.as_deref())
    .bind(query.priority.as_deref())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM demo_requests \
         WHERE is_deleted = FALSE \
           AND ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR priority = $2)",
    )
    .bind(query.status.as_deref())
    .bind(query.priority.as_deref())
    .fetch_one(pool.get_ref())
    .await?;

    let envelope = page_envelope("demoRequests", "totalDemoRequests", records, total, &page)?;
    Ok(response::ok(envelope, "Demo requests fetched successfully"))
}

pub async fn get_demo_request_by_id(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let record = sqlx::query_as::<_, DemoRequest>(
        "SELECT * FROM demo_requests WHERE id = $1 AND is_deleted = FALSE",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Demo request not found".to_string()))?;

    Ok(response::ok(record, "Demo request fetched successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDemoRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub demo_scheduled_at: Option<DateTime<Utc>>,
    pub follow_up_date: Option<DateTime<Utc>>,
}

pub async fn update_demo_request(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateDemoRequest>,
) -> Result<HttpResponse, AppError> {
    if let Some(status) = body.status.as_deref() {
        validate_choice(status, STATUSES, "status")?;
    }
    if let Some(priority) = body.priority.as_deref() {
        validate_choice(priority, PRIORITIES, "priority")?;
    }

    let record = sqlx::query_as::<_, DemoRequest>(
        "UPDATE demo_requests SET \
           status = COALESCE($2, status), \
           priority = COALESCE($3, priority), \
           notes = COALESCE($4, notes), \
           assigned_to = COALESCE($5, assigned_to), \
           demo_scheduled_at = COALESCE($6, demo_scheduled_at), \
           follow_up_date = COALESCE($7, follow_up_date), \
           updated_at = NOW() \
         WHERE id = $1 AND is_deleted = FALSE RETURNING *",
    )
    .bind(path.into_inner())
    .bind(body.status.as_deref())
    .bind(body.priority.as_deref())
    .bind(body.notes.as_deref())
    .bind(body.assigned_to)
    .bind(body.demo_scheduled_at)
    .bind(body.follow_up_date)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Demo request not found".to_string()))?;

    Ok(response::ok(record, "Demo request updated successfully"))
}

pub async fn delete_demo_request(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let updated = sqlx::query(
        "UPDATE demo_requests SET is_deleted = TRUE, updated_at = NOW() \
         WHERE id = $1 AND is_deleted = FALSE",
    )
    .bind(path.into_inner())
    .execute(pool.get_ref())
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Demo request not found".to_string()));
    }
    Ok(response::ok(json!({}), "Demo request deleted successfully"))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DemoRequestStats {
    pub total: i64,
    pub pending: i64,
    pub contacted: i64,
    pub demo_scheduled: i64,
    pub demo_completed: i64,
    pub converted: i64,
    pub rejected: i64,
}

pub async fn get_demo_request_stats(
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let stats = sqlx::query_as::<_, DemoRequestStats>(
        "SELECT COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                COUNT(*) FILTER (WHERE status = 'contacted') AS contacted, \
                COUNT(*) FILTER (WHERE status = 'demo-scheduled') AS demo_scheduled, \
                COUNT(*) FILTER (WHERE status = 'demo-completed') AS demo_completed, \
                COUNT(*) FILTER (WHERE status = 'converted') AS converted, \
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected \
         FROM demo_requests WHERE is_deleted = FALSE",
    )
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::ok(stats, "Demo request stats fetched successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_validation() {
        assert!(validate_choice("pending", STATUSES, "status").is_ok());
        assert!(validate_choice("archived", STATUSES, "status").is_err());
        assert!(validate_choice("1-10", COMPANY_SIZES, "companySize").is_ok());
        assert!(validate_choice("huge", COMPANY_SIZES, "companySize").is_err());
    }
}
