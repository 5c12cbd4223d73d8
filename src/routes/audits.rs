/// `/api/v1/master` handlers: audit question templates, their options,
/// staff assignment, the auditing walk, and submitted responses.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::PublicAccount;
use crate::error::AppError;
use crate::media_client::{MediaClient, StoredAsset};
use crate::pagination::{page_envelope, PageQuery};
use crate::response;
use crate::routes::uploads::{collect_form, UploadedFile};

const MAX_FILES: usize = 10;
const MAX_PHOTOS: usize = 10;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuestion {
    pub id: Uuid,
    pub name: String,
    pub is_assigned: bool,
    pub assigned_to: Option<Uuid>,
    pub is_published: bool,
    pub store_id: Option<Uuid>,
    pub company_id: Uuid,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Question joined with store/company/assignee names for listings.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuestionWithNames {
    pub id: Uuid,
    pub name: String,
    pub is_assigned: bool,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub is_published: bool,
    pub store_id: Option<Uuid>,
    pub store_name: Option<String>,
    pub company_id: Uuid,
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub prompt: String,
    pub score: f64,
    pub response_type: String,
    pub response_options: Value,
    pub wants_video: bool,
    pub wants_photo: bool,
    pub wants_file: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub id: Uuid,
    pub question: String,
    pub response: String,
    pub files: Value,
    pub photos: Value,
    pub video: Option<Value>,
    pub score: Option<f64>,
    pub message: String,
    pub option_id: Option<Uuid>,
    pub audit_question_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const QUESTION_WITH_NAMES: &str = "SELECT q.id, q.name, q.is_assigned, q.assigned_to, \
            a.name AS assigned_to_name, q.is_published, q.store_id, \
            s.name AS store_name, q.company_id, c.name AS company_name, \
            q.created_at, q.updated_at \
     FROM audit_questions q \
     LEFT JOIN accounts a ON a.id = q.assigned_to \
     LEFT JOIN stores s ON s.id = q.store_id \
     LEFT JOIN companies c ON c.id = q.company_id";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub name: String,
    pub store_id: Option<Uuid>,
}

pub async fn create_question(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    body: web::Json<CreateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;
    let company_id = caller
        .company_id
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let question = sqlx::query_as::<_, AuditQuestion>(
        "INSERT INTO audit_questions (id, name, store_id, company_id, created_by) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(body.store_id)
    .bind(company_id)
    .bind(caller.id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::created(question, "Audit question created successfully"))
}

#[derive(Deserialize)]
pub struct UpdateQuestionRequest {
    pub name: String,
}

pub async fn update_question(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let name = crate::validators::is_valid_name(&body.name)?;

    let question = sqlx::query_as::<_, AuditQuestion>(
        "UPDATE audit_questions SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .bind(&name)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit question does not exist".to_string()))?;

    Ok(response::ok(question, "Audit question updated successfully"))
}

pub async fn delete_question(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM audit_questions WHERE id = $1")
        .bind(question_id)
        .execute(pool.get_ref())
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Audit question does not exist".to_string(),
        ));
    }

    // Options have no reason to outlive their question.
    sqlx::query("DELETE FROM audit_options WHERE question_id = $1")
        .bind(question_id)
        .execute(pool.get_ref())
        .await?;

    Ok(response::ok(json!({}), "Audit question deleted successfully"))
}

pub async fn get_questions(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let company_id = caller
        .company_id
        .ok_or_else(|| AppError::Conflict("Please select the company".to_string()))?;

    let questions = sqlx::query_as::<_, AuditQuestionWithNames>(&format!(
        "{} WHERE q.company_id = $1 ORDER BY q.created_at DESC LIMIT $2 OFFSET $3",
        QUESTION_WITH_NAMES
    ))
    .bind(company_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM audit_questions WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(pool.get_ref())
            .await?;

    let envelope = page_envelope(
        "auditQuestions",
        "totalAuditQuestions",
        questions,
        total,
        &query,
    )?;
    Ok(response::ok(envelope, "Audit questions fetched successfully"))
}

pub async fn get_questions_by_store(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let questions = sqlx::query_as::<_, AuditQuestionWithNames>(&format!(
        "{} WHERE q.store_id = $1 ORDER BY q.created_at DESC",
        QUESTION_WITH_NAMES
    ))
    .bind(path.into_inner())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(response::ok(questions, "Audit questions fetched successfully"))
}

pub async fn get_question_by_id(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let question = sqlx::query_as::<_, AuditQuestionWithNames>(&format!(
        "{} WHERE q.id = $1",
        QUESTION_WITH_NAMES
    ))
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit question does not exist".to_string()))?;

    Ok(response::ok(question, "Audit question fetched successfully"))
}

/// Questions assigned to the calling staff member, published only.
pub async fn get_assigned_questions(
    pool: web::Data<PgPool>,
    caller: web::ReqData<PublicAccount>,
) -> Result<HttpResponse, AppError> {
    let questions = sqlx::query_as::<_, AuditQuestion>(
        "SELECT * FROM audit_questions \
         WHERE assigned_to = $1 AND is_published = TRUE \
         ORDER BY created_at DESC",
    )
    .bind(caller.id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(response::ok(questions, "Audit questions fetched successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAuditRequest {
    pub user_id: Uuid,
}

pub async fn assign_auditing(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<AssignAuditRequest>,
) -> Result<HttpResponse, AppError> {
    let question = sqlx::query_as::<_, AuditQuestion>(
        "UPDATE audit_questions \
         SET is_assigned = TRUE, assigned_to = $2, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .bind(body.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit question does not exist".to_string()))?;

    Ok(response::ok(question, "Audit assigned successfully"))
}

pub async fn toggle_published(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let question = sqlx::query_as::<_, AuditQuestion>(
        "UPDATE audit_questions \
         SET is_published = NOT is_published, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit question does not exist".to_string()))?;

    Ok(response::ok(question, "Audit question updated successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptionRequest {
    pub question_id: Uuid,
    pub prompt: String,
    pub score: Option<f64>,
    pub response_type: Option<String>,
    /// Comma-separated list; stored as `[{"message": ...}]`.
    pub response_option: Option<String>,
    pub wants_video: Option<bool>,
    pub wants_photo: Option<bool>,
    pub wants_file: Option<bool>,
    pub message: Option<String>,
}

fn split_response_options(raw: Option<&str>) -> Value {
    let messages: Vec<Value> = raw
        .unwrap_or("")
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| json!({ "message": s }))
        .collect();
    Value::Array(messages)
}

pub async fn create_option(
    pool: web::Data<PgPool>,
    body: web::Json<CreateOptionRequest>,
) -> Result<HttpResponse, AppError> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }

    sqlx::query_as::<_, AuditQuestion>("SELECT * FROM audit_questions WHERE id = $1")
        .bind(body.question_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Audit question does not exist".to_string()))?;

    let option = sqlx::query_as::<_, AuditOption>(
        "INSERT INTO audit_options \
         (id, question_id, prompt, score, response_type, response_options, \
          wants_video, wants_photo, wants_file, message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(body.question_id)
    .bind(body.prompt.trim())
    .bind(body.score.unwrap_or(0.0))
    .bind(body.response_type.as_deref().unwrap_or(""))
    .bind(split_response_options(body.response_option.as_deref()))
    .bind(body.wants_video.unwrap_or(false))
    .bind(body.wants_photo.unwrap_or(false))
    .bind(body.wants_file.unwrap_or(false))
    .bind(body.message.as_deref().unwrap_or(""))
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::created(option, "Audit option created successfully"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionRequest {
    pub prompt: String,
    pub score: Option<f64>,
    pub response_type: Option<String>,
    pub response_option: Option<String>,
    pub wants_video: Option<bool>,
    pub wants_photo: Option<bool>,
    pub wants_file: Option<bool>,
    pub message: Option<String>,
}

pub async fn update_option(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOptionRequest>,
) -> Result<HttpResponse, AppError> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }

    let option = sqlx::query_as::<_, AuditOption>(
        "UPDATE audit_options \
         SET prompt = $2, score = $3, response_type = $4, response_options = $5, \
             wants_video = $6, wants_photo = $7, wants_file = $8, message = $9, \
             updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(path.into_inner())
    .bind(body.prompt.trim())
    .bind(body.score.unwrap_or(0.0))
    .bind(body.response_type.as_deref().unwrap_or(""))
    .bind(split_response_options(body.response_option.as_deref()))
    .bind(body.wants_video.unwrap_or(false))
    .bind(body.wants_photo.unwrap_or(false))
    .bind(body.wants_file.unwrap_or(false))
    .bind(body.message.as_deref().unwrap_or(""))
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit option does not exist".to_string()))?;

    Ok(response::ok(option, "Audit option updated successfully"))
}

pub async fn delete_option(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let deleted = sqlx::query("DELETE FROM audit_options WHERE id = $1")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Audit option does not exist".to_string(),
        ));
    }
    Ok(response::ok(json!({}), "Audit option deleted successfully"))
}

pub async fn get_options_by_question(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();

    let options = sqlx::query_as::<_, AuditOption>(
        "SELECT * FROM audit_options WHERE question_id = $1 \
         ORDER BY created_at LIMIT $2 OFFSET $3",
    )
    .bind(question_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM audit_options WHERE question_id = $1")
            .bind(question_id)
            .fetch_one(pool.get_ref())
            .await?;

    let envelope = page_envelope("options", "totalOptions", options, total, &query)?;
    Ok(response::ok(envelope, "Audit options fetched successfully"))
}

#[derive(Deserialize)]
pub struct StartAuditingQuery {
    pub index: Option<i64>,
}

/// Walks a question's options one at a time, in insertion order.
pub async fn start_auditing(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    query: web::Query<StartAuditingQuery>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    let index = query.index.unwrap_or(0).max(0);

    let question = sqlx::query_as::<_, AuditQuestion>(
        "SELECT * FROM audit_questions WHERE id = $1",
    )
    .bind(question_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit question does not exist".to_string()))?;

    if !question.is_published {
        return Err(AppError::InvalidState(
            "Audit question is not published".to_string(),
        ));
    }

    let (total_options,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM audit_options WHERE question_id = $1")
            .bind(question_id)
            .fetch_one(pool.get_ref())
            .await?;

    let option = sqlx::query_as::<_, AuditOption>(
        "SELECT * FROM audit_options WHERE question_id = $1 \
         ORDER BY created_at LIMIT 1 OFFSET $2",
    )
    .bind(question_id)
    .bind(index)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("No more questions".to_string()))?;

    Ok(response::ok(
        json!({
            "auditQuestion": question,
            "option": option,
            "index": index,
            "totalOptions": total_options,
        }),
        "Audit option fetched successfully",
    ))
}

fn enforce_upload_cap(files: &[&UploadedFile], cap: usize, field: &str) -> Result<(), AppError> {
    if files.len() > cap {
        return Err(AppError::Validation(format!(
            "Maximum {} {} are allowed",
            cap, field
        )));
    }
    Ok(())
}

async fn upload_all(
    media_client: &MediaClient,
    files: Vec<&UploadedFile>,
    folder: &str,
) -> Result<Vec<StoredAsset>, AppError> {
    let mut assets = Vec::with_capacity(files.len());
    for file in files {
        let asset = media_client
            .upload(&file.file_name, file.bytes.clone(), folder)
            .await
            .map_err(AppError::Internal)?;
        assets.push(asset);
    }
    Ok(assets)
}

/// Multipart submission: text fields plus `files` (up to 10), `photos`
/// (up to 10) and `video` (one) attachments.
pub async fn submit_response(
    pool: web::Data<PgPool>,
    media_client: web::Data<MediaClient>,
    caller: web::ReqData<PublicAccount>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = collect_form(payload).await?;

    let question = form.required_text("question")?.to_string();
    let response_text = form.text("response").unwrap_or("").to_string();
    let message = form.text("message").unwrap_or("").to_string();
    let score = form
        .text("score")
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| AppError::Validation("score must be a number".to_string()))
        })
        .transpose()?;
    let parse_uuid = |field: &str| -> Result<Option<Uuid>, AppError> {
        form.text(field)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Uuid::parse_str(s).map_err(|_| {
                    AppError::Validation(format!("{} must be a valid id", field))
                })
            })
            .transpose()
    };
    let option_id = parse_uuid("optionId")?;
    let audit_question_id = parse_uuid("auditQuestionId")?;
    let store_id = parse_uuid("storeId")?;

    let files = form.files_for("files");
    let photos = form.files_for("photos");
    let videos = form.files_for("video");
    enforce_upload_cap(&files, MAX_FILES, "files")?;
    enforce_upload_cap(&photos, MAX_PHOTOS, "photos")?;
    enforce_upload_cap(&videos, 1, "video")?;

    let file_assets = upload_all(&media_client, files, "audit-files").await?;
    let photo_assets = upload_all(&media_client, photos, "audit-photos").await?;
    let video_asset = upload_all(&media_client, videos, "audit-videos")
        .await?
        .into_iter()
        .next();

    let files_json =
        serde_json::to_value(&file_assets).map_err(|e| AppError::Internal(e.to_string()))?;
    let photos_json =
        serde_json::to_value(&photo_assets).map_err(|e| AppError::Internal(e.to_string()))?;
    let video_json = video_asset
        .map(|v| serde_json::to_value(&v).map_err(|e| AppError::Internal(e.to_string())))
        .transpose()?;

    let record = sqlx::query_as::<_, AuditResponse>(
        "INSERT INTO audit_responses \
         (id, question, response, files, photos, video, score, message, \
          option_id, audit_question_id, store_id, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&question)
    .bind(&response_text)
    .bind(files_json)
    .bind(photos_json)
    .bind(video_json)
    .bind(score)
    .bind(&message)
    .bind(option_id)
    .bind(audit_question_id)
    .bind(store_id)
    .bind(caller.id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::created(record, "Audit response submitted successfully"))
}

pub async fn get_responses(
    pool: web::Data<PgPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let responses = sqlx::query_as::<_, AuditResponse>(
        "SELECT * FROM audit_responses ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool.get_ref())
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_responses")
        .fetch_one(pool.get_ref())
        .await?;

    let envelope = page_envelope("responses", "totalResponses", responses, total, &query)?;
    Ok(response::ok(envelope, "Audit responses fetched successfully"))
}

pub async fn get_response_by_id(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let record = sqlx::query_as::<_, AuditResponse>(
        "SELECT * FROM audit_responses WHERE id = $1",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Audit response does not exist".to_string()))?;

    Ok(response::ok(record, "Audit response fetched successfully"))
}

#[derive(Deserialize)]
pub struct ResponsesByAuditQuery {
    /// `YYYY-MM-DD`; filters to that calendar day when present.
    pub date: Option<String>,
}

pub async fn get_responses_by_audit_id(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    query: web::Query<ResponsesByAuditQuery>,
) -> Result<HttpResponse, AppError> {
    let audit_question_id = path.into_inner();

    let day_bounds = query
        .date
        .as_deref()
        .map(|raw| {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::Validation("date must be in YYYY-MM-DD format".to_string())
            })?;
            let start = day
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| AppError::Validation("invalid date".to_string()))?;
            let start = Utc.from_utc_datetime(&start);
            Ok::<_, AppError>((start, start + chrono::Duration::days(1)))
        })
        .transpose()?;

    let responses = match day_bounds {
        Some((start, end)) => {
            sqlx::query_as::<_, AuditResponse>(
                "SELECT * FROM audit_responses \
                 WHERE audit_question_id = $1 AND created_at >= $2 AND created_at < $3 \
                 ORDER BY created_at DESC",
            )
            .bind(audit_question_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => {
            sqlx::query_as::<_, AuditResponse>(
                "SELECT * FROM audit_responses \
                 WHERE audit_question_id = $1 ORDER BY created_at DESC",
            )
            .bind(audit_question_id)
            .fetch_all(pool.get_ref())
            .await?
        }
    };

    Ok(response::ok(responses, "Audit responses fetched successfully"))
}
