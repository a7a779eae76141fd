use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Application pipeline stage. Stored as its name in `jobs.status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text")]
pub enum JobStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub position: String,
    pub status: JobStatus,
    pub job_description: String,
    /// Last AI match score (0–100); null until analysed.
    pub ai_score: Option<i32>,
    pub ai_feedback: String,
    pub notes: String,
    pub applied_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
