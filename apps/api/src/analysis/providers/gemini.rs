//! Google Gemini adapter — generateContent REST endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{non_empty, require_credential, send_json, CredentialSource, ProviderAdapter};
use crate::analysis::{AnalysisError, ProviderId};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const MODEL: &str = "gemini-2.0-flash";
const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate, the same thing the
    /// SDK's `response.text()` accessor returns.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

pub struct GeminiAdapter {
    base_url: String,
    http: Client,
    credentials: Arc<dyn CredentialSource>,
}

impl GeminiAdapter {
    pub fn new(http: Client, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            http,
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{MODEL}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn invoke(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let api_key = require_credential(self.credentials.as_ref(), self.id(), API_KEY_VAR)?;

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let request = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key.as_str())])
            .json(&body);

        let response: GeminiResponse = send_json(self.id(), request, cancel).await?;

        if let Some(reason) = response.block_reason() {
            return Err(AnalysisError::provider(
                self.id(),
                format!("prompt blocked: {reason}"),
            ));
        }

        non_empty(self.id(), response.into_text())
    }
}
