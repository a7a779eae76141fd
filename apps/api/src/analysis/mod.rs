//! Resume analysis — scores a resume against a job description using one of
//! several interchangeable LLM providers.
//!
//! Flow: resolve resume text (extract.rs) → build prompt (prompts.rs) →
//!       invoke one provider adapter (providers/) → normalize reply (normalize.rs).
//!
//! The pipeline lives in `analyzer.rs`. Nothing in this module touches the
//! database; persisting the result onto the job row is the handler's job.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod analyzer;
pub mod extract;
pub mod handlers;
pub mod normalize;
pub mod prompts;
pub mod providers;

// ────────────────────────────────────────────────────────────────────────────
// Request / result models
// ────────────────────────────────────────────────────────────────────────────

/// An uploaded resume document. Only `.pdf` and `.docx` are accepted.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Bytes,
    pub filename: String,
}

/// Where the resume text comes from.
#[derive(Debug, Clone)]
pub enum ResumeSource {
    Text(String),
    Document(Document),
}

/// A single analysis call. `provider` is kept as the caller sent it and is
/// resolved to a `ProviderId` inside the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub resume: ResumeSource,
    pub job_description: String,
    pub provider: String,
}

/// Normalized, validated model output. `score` is always within 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: u8,
    pub feedback: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Provider identity
// ────────────────────────────────────────────────────────────────────────────

/// The closed set of supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    #[serde(rename = "deepseek")]
    DeepSeek,
    Ollama,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Claude,
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::DeepSeek,
        ProviderId::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Claude => "claude",
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnalysisError::UnknownProvider(s.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every way an analysis call can fail. None of these are retried here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unsupported file type '{0}'. Only PDF and DOCX are allowed.")]
    UnsupportedFormat(String),

    #[error("Failed to extract text from document: {0}")]
    ExtractionFailed(String),

    #[error("Invalid analysis request: {0}")]
    InvalidRequest(String),

    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),

    #[error("{provider} provider error: {cause}")]
    Provider { provider: ProviderId, cause: String },

    /// `raw` is kept for logs only and is deliberately absent from `Display`.
    #[error("Malformed provider response: {reason}")]
    MalformedResponse { raw: String, reason: String },
}

impl AnalysisError {
    pub fn provider(provider: ProviderId, cause: impl fmt::Display) -> Self {
        AnalysisError::Provider {
            provider,
            cause: cause.to_string(),
        }
    }

    pub fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedResponse {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}
