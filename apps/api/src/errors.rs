use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => {
                tracing::debug!("Rejected request: {msg}");
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Authentication required".to_string(),
                )
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not authorized".to_string(),
            ),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_TYPE",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Analysis(e) => analysis_parts(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn analysis_parts(e: &AnalysisError) -> (StatusCode, &'static str, String) {
    match e {
        AnalysisError::UnsupportedFormat(_) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_FORMAT",
            e.to_string(),
        ),
        AnalysisError::ExtractionFailed(cause) => {
            tracing::warn!("Resume extraction failed: {cause}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                "Could not read the uploaded resume. Please re-upload it.".to_string(),
            )
        }
        AnalysisError::InvalidRequest(msg) => {
            (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
        }
        AnalysisError::UnknownProvider(_) => {
            (StatusCode::BAD_REQUEST, "UNKNOWN_PROVIDER", e.to_string())
        }
        AnalysisError::Provider { provider, cause } => {
            tracing::error!("LLM provider {provider} failed: {cause}");
            (
                StatusCode::BAD_GATEWAY,
                "PROVIDER_ERROR",
                format!("The {provider} AI provider is unavailable. Try another provider."),
            )
        }
        AnalysisError::MalformedResponse { reason, .. } => {
            // Raw text is logged by the analyzer; it never reaches the client.
            (
                StatusCode::BAD_GATEWAY,
                "MALFORMED_RESPONSE",
                format!("The AI provider returned an unusable analysis: {reason}"),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
