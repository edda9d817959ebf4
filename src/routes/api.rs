use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::db::{self, Department, SubmissionRecord, SubmissionView};
use crate::error::{ApiError, ApiResult};
use crate::notify::build_notifications;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 50;

#[derive(Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub departments: Vec<Department>,
    pub summary: String,
    pub mongo_id: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub mongo_id: String,
    pub question: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub data: Vec<SubmissionView>,
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut filename = String::new();
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            file_data = Some(data.to_vec());
        }
    }

    let file_data = match file_data {
        Some(data) if !data.is_empty() => data,
        _ => return Err(ApiError::BadRequest("No file provided".to_string())),
    };

    if !is_pdf_filename(&filename) {
        return Err(ApiError::BadRequest(
            "Only PDF files are allowed".to_string(),
        ));
    }

    let extracted_text = state.docai.extract_text(&file_data).await.map_err(|e| {
        error!("Error extracting text from PDF: {e}");
        ApiError::Extraction(e.to_string())
    })?;

    let analysis = state.llm.analyze_document(&extracted_text).await.map_err(|e| {
        error!("Error processing extracted text: {e}");
        ApiError::Llm(e.to_string())
    })?;

    let email_data = build_notifications(&analysis.departments, &analysis.summary, &filename);

    let record = SubmissionRecord {
        id: None,
        filename: filename.clone(),
        extracted_text,
        summary: analysis.summary.clone(),
        departments: analysis.departments.clone(),
        timestamp: Utc::now(),
        email_data: email_data.clone(),
    };

    let inserted_id = db::insert_record(&state.records, &record).await?;

    // Fire-and-forget: the response does not wait for delivery, and a failed
    // batch is only ever visible in the logs.
    let mail_state = state.clone();
    tokio::spawn(async move {
        mail_state.mailer.send_batch(&email_data).await;
    });

    Ok(Json(UploadResponse {
        filename,
        departments: analysis.departments,
        summary: analysis.summary,
        mongo_id: inserted_id.to_hex(),
    }))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    // An identifier that does not even parse matches no record.
    let id = ObjectId::parse_str(&request.mongo_id)
        .map_err(|_| ApiError::NotFound("Document not found".to_string()))?;

    let record = db::find_record(&state.records, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    let answer = state
        .llm
        .answer_question(&record.summary, &record.extracted_text, &request.question)
        .await
        .map_err(|e| {
            error!("Error answering question: {e}");
            ApiError::Llm(e.to_string())
        })?;

    Ok(Json(ChatResponse { answer }))
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let page = normalize_page(query.page);
    let limit = normalize_limit(query.limit);

    let total = db::count_records(&state.records).await?;
    let skip = ((page - 1) * limit) as u64;
    let records = db::list_page(&state.records, skip, limit).await?;

    let total_pages = total_pages(total, limit);

    Ok(Json(ListResponse {
        data: records.into_iter().map(SubmissionView::from).collect(),
        page,
        limit,
        total,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    }))
}

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    db::ping(&state.db).await.map_err(|e| {
        error!("Health check failed: {e}");
        ApiError::ServiceUnavailable("Service unhealthy".to_string())
    })?;

    Ok(Json(serde_json::json!({ "status": "healthy" })))
}

fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

fn normalize_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(limit) if limit >= 1 => limit.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

fn total_pages(total: u64, limit: i64) -> i64 {
    let limit = limit as u64;
    ((total + limit - 1) / limit) as i64
}
