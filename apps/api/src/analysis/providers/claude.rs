//! Claude adapter — Anthropic Messages API.
//!
//! Model: claude-sonnet-4-5-20250929 (hardcoded — do not make configurable to prevent drift)

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{non_empty, require_credential, send_json, CredentialSource, ProviderAdapter};
use crate::analysis::{AnalysisError, ProviderId};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5-20250929";
const MAX_TOKENS: u32 = 1024;
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    /// Text of the first text block.
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
    }
}

pub struct ClaudeAdapter {
    base_url: String,
    http: Client,
    credentials: Arc<dyn CredentialSource>,
}

impl ClaudeAdapter {
    pub fn new(http: Client, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            http,
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    async fn invoke(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let api_key = require_credential(self.credentials.as_ref(), self.id(), API_KEY_VAR)?;

        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response: AnthropicResponse = send_json(self.id(), request, cancel).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Claude usage: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        non_empty(self.id(), response.into_text())
    }
}
