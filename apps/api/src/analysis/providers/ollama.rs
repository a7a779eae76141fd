//! Ollama adapter — local `/api/chat` endpoint, non-streaming. No API key.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{credential_or, non_empty, send_json, CredentialSource, ProviderAdapter};
use crate::analysis::{AnalysisError, ProviderId};

const BASE_URL_VAR: &str = "OLLAMA_BASE_URL";
const MODEL_VAR: &str = "OLLAMA_MODEL";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaReply>,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    content: Option<String>,
}

pub struct OllamaAdapter {
    http: Client,
    credentials: Arc<dyn CredentialSource>,
}

impl OllamaAdapter {
    pub fn new(http: Client, credentials: Arc<dyn CredentialSource>) -> Self {
        Self { http, credentials }
    }

    /// `(chat endpoint, model)` as currently configured.
    fn target(&self) -> (String, String) {
        let base_url = credential_or(self.credentials.as_ref(), BASE_URL_VAR, DEFAULT_BASE_URL);
        let model = credential_or(self.credentials.as_ref(), MODEL_VAR, DEFAULT_MODEL);
        (format!("{}/api/chat", base_url.trim_end_matches('/')), model)
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    async fn invoke(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let (endpoint, model) = self.target();
        debug!("Calling Ollama at {endpoint} with model {model}");

        let body = OllamaChatRequest {
            model: &model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let request = self.http.post(&endpoint).json(&body);
        let response: OllamaChatResponse = send_json(self.id(), request, cancel).await?;

        non_empty(self.id(), response.message.and_then(|m| m.content))
    }
}
