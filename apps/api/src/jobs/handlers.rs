//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::store::{self, JobChanges, NewJob};
use crate::models::job::{JobRow, JobStatus};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub notes: String,
    pub applied_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<JobStatus>,
    pub job_description: Option<String>,
    pub notes: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_blank("company", &self.company)?;
        require_non_blank("position", &self.position)
    }
}

impl UpdateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(company) = &self.company {
            require_non_blank("company", company)?;
        }
        if let Some(position) = &self.position {
            require_non_blank("position", position)?;
        }
        Ok(())
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("Please add a {field}")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(store::list_jobs(&state.db, user.user_id).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    request.validate()?;

    let job = store::create_job(
        &state.db,
        NewJob {
            user_id: user.user_id,
            company: request.company.trim(),
            position: request.position.trim(),
            status: request.status,
            job_description: &request.job_description,
            notes: &request.notes,
            applied_date: request.applied_date,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    let job = store::load_owned_job(&state.db, job_id, user.user_id).await?;
    Ok(Json(job))
}

/// PUT /api/v1/jobs/:id
///
/// Only the fields present in the body change. AI results are not editable here.
pub async fn handle_update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(request): Json<UpdateJobRequest>,
) -> Result<Json<JobRow>, AppError> {
    request.validate()?;
    store::load_owned_job(&state.db, job_id, user.user_id).await?;

    let job = store::update_job(
        &state.db,
        job_id,
        JobChanges {
            company: request.company.as_deref().map(str::trim),
            position: request.position.as_deref().map(str::trim),
            status: request.status,
            job_description: request.job_description.as_deref(),
            notes: request.notes.as_deref(),
            applied_date: request.applied_date,
        },
    )
    .await?;

    Ok(Json(job))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    store::load_owned_job(&state.db, job_id, user.user_id).await?;
    store::delete_job(&state.db, job_id).await?;
    Ok(Json(MessageResponse {
        message: "Job removed".to_string(),
    }))
}
