//! Job persistence. Every query is scoped by primary key; ownership checks
//! happen in `load_owned_job` so handlers can tell 404 from 403.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::errors::AppError;
use crate::models::job::{JobRow, JobStatus};

/// Fields accepted when creating a job.
pub struct NewJob<'a> {
    pub user_id: Uuid,
    pub company: &'a str,
    pub position: &'a str,
    pub status: JobStatus,
    pub job_description: &'a str,
    pub notes: &'a str,
    pub applied_date: Option<DateTime<Utc>>,
}

/// Partial update; `None` leaves the column as is.
#[derive(Default)]
pub struct JobChanges<'a> {
    pub company: Option<&'a str>,
    pub position: Option<&'a str>,
    pub status: Option<JobStatus>,
    pub job_description: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub applied_date: Option<DateTime<Utc>>,
}

pub async fn list_jobs(pool: &PgPool, user_id: Uuid) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn find_job(pool: &PgPool, job_id: Uuid) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await
}

/// Loads a job and checks it belongs to `user_id`.
pub async fn load_owned_job(pool: &PgPool, job_id: Uuid, user_id: Uuid) -> Result<JobRow, AppError> {
    let job = require_found(find_job(pool, job_id).await?)?;

    if job.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(job)
}

fn require_found(row: Option<JobRow>) -> Result<JobRow, AppError> {
    row.ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

pub async fn create_job(pool: &PgPool, job: NewJob<'_>) -> Result<JobRow, sqlx::Error> {
    let id = Uuid::new_v4();
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs (id, user_id, company, position, status, job_description, notes, applied_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, now()))
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(job.user_id)
    .bind(job.company)
    .bind(job.position)
    .bind(job.status)
    .bind(job.job_description)
    .bind(job.notes)
    .bind(job.applied_date)
    .fetch_one(pool)
    .await?;

    info!("Created job {id} for user {}", job.user_id);
    Ok(row)
}

/// A job deleted between the ownership check and this update is a 404.
pub async fn update_job(
    pool: &PgPool,
    job_id: Uuid,
    changes: JobChanges<'_>,
) -> Result<JobRow, AppError> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            company         = COALESCE($2, company),
            position        = COALESCE($3, position),
            status          = COALESCE($4, status),
            job_description = COALESCE($5, job_description),
            notes           = COALESCE($6, notes),
            applied_date    = COALESCE($7, applied_date)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(changes.company)
    .bind(changes.position)
    .bind(changes.status)
    .bind(changes.job_description)
    .bind(changes.notes)
    .bind(changes.applied_date)
    .fetch_optional(pool)
    .await?;

    require_found(row)
}

pub async fn delete_job(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    info!("Deleted job {job_id}");
    Ok(())
}

/// Stores the latest analysis on the job, replacing any previous one.
pub async fn save_analysis(
    pool: &PgPool,
    job_id: Uuid,
    result: &AnalysisResult,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE jobs SET ai_score = $1, ai_feedback = $2 WHERE id = $3")
        .bind(i32::from(result.score))
        .bind(&result.feedback)
        .bind(job_id)
        .execute(pool)
        .await?;
    info!("Stored AI score {} on job {job_id}", result.score);
    Ok(())
}
