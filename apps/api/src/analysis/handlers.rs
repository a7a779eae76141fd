//! Axum route handlers for the AI analysis API.
//!
//! Both endpoints load the job, check ownership and the stored job
//! description, run the analyzer under a deadline, and overwrite the job's
//! `ai_score` / `ai_feedback` with the result.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::analysis::analyzer::deadline_token;
use crate::analysis::{AnalysisRequest, AnalysisResult, Document, ResumeSource};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::store;
use crate::state::AppState;

/// Largest accepted resume upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Body limit for the upload route: the file plus room for the other parts.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

const DEFAULT_PROVIDER: &str = "claude";

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume: String,
    pub job_id: Uuid,
    pub provider: Option<String>,
}

/// Parts collected from the multipart upload form.
#[derive(Debug, Default)]
struct UploadForm {
    resume: Option<Document>,
    job_id: Option<Uuid>,
    provider: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/analyze
///
/// Resume supplied as plain text.
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let result = run_analysis(
        &state,
        user,
        request.job_id,
        ResumeSource::Text(request.resume),
        request.provider,
    )
    .await?;
    Ok(Json(result))
}

/// POST /api/v1/ai/analyze/upload
///
/// Multipart form: `resume` (PDF or DOCX file), `job_id`, optional `provider`.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError> {
    let form = read_upload_form(multipart).await?;

    let document = form
        .resume
        .ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;
    let job_id = form
        .job_id
        .ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;

    let result = run_analysis(
        &state,
        user,
        job_id,
        ResumeSource::Document(document),
        form.provider,
    )
    .await?;
    Ok(Json(result))
}

async fn run_analysis(
    state: &AppState,
    user: AuthUser,
    job_id: Uuid,
    resume: ResumeSource,
    provider: Option<String>,
) -> Result<AnalysisResult, AppError> {
    let job = store::load_owned_job(&state.db, job_id, user.user_id).await?;

    if job.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required for AI analysis".to_string(),
        ));
    }

    let provider = provider
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
    info!("Analyzing resume for job {job_id} with provider '{provider}'");

    let request = AnalysisRequest {
        resume,
        job_description: job.job_description,
        provider,
    };

    let (cancel, _cancel_on_drop) = deadline_token(state.config.ai_request_timeout);
    let result = state.analyzer.analyze(request, &cancel).await?;

    store::save_analysis(&state.db, job.id, &result).await?;
    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart parsing
// ────────────────────────────────────────────────────────────────────────────

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
                    return Err(AppError::UnsupportedMediaType(
                        "Only PDF and DOCX files are allowed".to_string(),
                    ));
                }
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("resume part has no filename".to_string()))?;
                let bytes: Bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(too_large());
                }
                form.resume = Some(Document { bytes, filename });
            }
            "job_id" => {
                let text = field.text().await.map_err(multipart_error)?;
                let job_id = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::Validation("job_id must be a UUID".to_string()))?;
                form.job_id = Some(job_id);
            }
            "provider" => {
                form.provider = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        AppError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

fn too_large() -> AppError {
    AppError::PayloadTooLarge("Resume files are limited to 10 MiB".to_string())
}
