//! OpenAI-compatible chat-completions adapter.
//!
//! Serves both OpenAI and DeepSeek; they differ only in base URL, model and
//! the environment key holding the API key.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{non_empty, require_credential, send_json, CredentialSource, ProviderAdapter};
use crate::analysis::{AnalysisError, ProviderId};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const DEEPSEEK_KEY_VAR: &str = "DEEPSEEK_API_KEY";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    /// Content of the first choice's message.
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

pub struct ChatCompletionsAdapter {
    provider: ProviderId,
    base_url: String,
    model: &'static str,
    api_key_var: &'static str,
    http: Client,
    credentials: Arc<dyn CredentialSource>,
}

impl ChatCompletionsAdapter {
    pub fn openai(http: Client, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            provider: ProviderId::OpenAi,
            base_url: OPENAI_BASE_URL.to_string(),
            model: OPENAI_MODEL,
            api_key_var: OPENAI_KEY_VAR,
            http,
            credentials,
        }
    }

    pub fn deepseek(http: Client, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            provider: ProviderId::DeepSeek,
            base_url: DEEPSEEK_BASE_URL.to_string(),
            model: DEEPSEEK_MODEL,
            api_key_var: DEEPSEEK_KEY_VAR,
            http,
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderAdapter for ChatCompletionsAdapter {
    fn id(&self) -> ProviderId {
        self.provider
    }

    async fn invoke(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let api_key = require_credential(self.credentials.as_ref(), self.provider, self.api_key_var)?;

        let body = ChatRequest {
            model: self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let request = self.http.post(self.endpoint()).bearer_auth(api_key).json(&body);
        let response: ChatResponse = send_json(self.provider, request, cancel).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "{} usage: prompt_tokens={}, completion_tokens={}",
                self.provider, usage.prompt_tokens, usage.completion_tokens
            );
        }

        non_empty(self.provider, response.into_text())
    }
}
