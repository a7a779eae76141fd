//! Provider adapters — one per LLM backend, all behind `ProviderAdapter`.
//!
//! ARCHITECTURAL RULE: adapters are stateless. Credentials and endpoint
//! overrides are read through a `CredentialSource` on every call, so a key
//! added to the environment is picked up without a restart and a missing key
//! only fails the calls that need it.
//!
//! Adding a backend means adding a `ProviderId` variant, an adapter file and
//! one arm in `ProviderRegistry::adapter`; the analyzer is untouched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analysis::{AnalysisError, ProviderId};

pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

/// Given a prompt, return the model's raw text reply.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn invoke(&self, prompt: &str, cancel: &CancellationToken)
        -> Result<String, AnalysisError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Credentials
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide key/value configuration, read at call time.
pub trait CredentialSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment (`.env` is loaded once at startup).
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fetches a required, non-blank credential or fails the call.
pub(crate) fn require_credential(
    credentials: &dyn CredentialSource,
    provider: ProviderId,
    key: &str,
) -> Result<String, AnalysisError> {
    credentials
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AnalysisError::provider(provider, format!("{key} is not configured")))
}

/// Optional setting with a fallback for blank or missing values.
pub(crate) fn credential_or(credentials: &dyn CredentialSource, key: &str, default: &str) -> String {
    credentials
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// One adapter per `ProviderId`, resolved by exhaustive match.
#[derive(Clone)]
pub struct ProviderRegistry {
    claude: Arc<dyn ProviderAdapter>,
    openai: Arc<dyn ProviderAdapter>,
    gemini: Arc<dyn ProviderAdapter>,
    deepseek: Arc<dyn ProviderAdapter>,
    ollama: Arc<dyn ProviderAdapter>,
}

impl ProviderRegistry {
    pub fn new(
        claude: Arc<dyn ProviderAdapter>,
        openai: Arc<dyn ProviderAdapter>,
        gemini: Arc<dyn ProviderAdapter>,
        deepseek: Arc<dyn ProviderAdapter>,
        ollama: Arc<dyn ProviderAdapter>,
    ) -> Self {
        Self {
            claude,
            openai,
            gemini,
            deepseek,
            ollama,
        }
    }

    /// Production registry: real HTTP adapters sharing one client.
    pub fn with_credentials(http: Client, credentials: Arc<dyn CredentialSource>) -> Self {
        Self::new(
            Arc::new(claude::ClaudeAdapter::new(http.clone(), credentials.clone())),
            Arc::new(openai::ChatCompletionsAdapter::openai(
                http.clone(),
                credentials.clone(),
            )),
            Arc::new(gemini::GeminiAdapter::new(http.clone(), credentials.clone())),
            Arc::new(openai::ChatCompletionsAdapter::deepseek(
                http.clone(),
                credentials.clone(),
            )),
            Arc::new(ollama::OllamaAdapter::new(http, credentials)),
        )
    }

    pub fn from_env(http: Client) -> Self {
        Self::with_credentials(http, Arc::new(EnvCredentials))
    }

    pub fn adapter(&self, id: ProviderId) -> &dyn ProviderAdapter {
        match id {
            ProviderId::Claude => self.claude.as_ref(),
            ProviderId::OpenAi => self.openai.as_ref(),
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::DeepSeek => self.deepseek.as_ref(),
            ProviderId::Ollama => self.ollama.as_ref(),
        }
    }
}

/// Shared outbound HTTP client. One pool for every adapter.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

// ────────────────────────────────────────────────────────────────────────────
// Transport helper
// ────────────────────────────────────────────────────────────────────────────

/// Sends a JSON request and decodes a JSON body, racing both the send and the
/// body read against `cancel`. Non-2xx statuses become `Provider` errors
/// carrying the remote error message when one can be found.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: ProviderId,
    request: RequestBuilder,
    cancel: &CancellationToken,
) -> Result<T, AnalysisError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(cancelled(provider)),
        sent = request.send() => sent.map_err(|e| AnalysisError::provider(provider, format!("HTTP error: {e}")))?,
    };

    let status = response.status();

    if !status.is_success() {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(provider)),
            body = response.text() => body.unwrap_or_default(),
        };
        let message = remote_error_message(&body).unwrap_or(body);
        warn!("{provider} API returned {status}: {message}");
        return Err(AnalysisError::provider(
            provider,
            format!("API error (status {}): {message}", status.as_u16()),
        ));
    }

    let decoded = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(cancelled(provider)),
        decoded = response.json::<T>() => decoded,
    };

    debug!("{provider} call succeeded with status {status}");
    decoded.map_err(|e| AnalysisError::provider(provider, format!("unreadable response body: {e}")))
}

fn cancelled(provider: ProviderId) -> AnalysisError {
    AnalysisError::provider(provider, "request cancelled")
}

/// Pulls the human-readable message out of the common error envelopes:
/// `{"error": {"message": "..."}}` (Anthropic, OpenAI, DeepSeek, Gemini)
/// and `{"error": "..."}` (Ollama).
fn remote_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}

/// Rejects an empty or whitespace-only reply.
pub(crate) fn non_empty(provider: ProviderId, text: Option<String>) -> Result<String, AnalysisError> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AnalysisError::provider(provider, "LLM returned empty content"))
}


#[cfg(test)]
mod tests {
    use super::testing::StaticCredentials;
    use super::*;

    #[test]
    fn test_require_credential_rejects_missing_and_blank() {
        let creds = StaticCredentials::with(&[("BLANK_KEY", "   ")]);
        for key in ["MISSING_KEY", "BLANK_KEY"] {
            let err = require_credential(&creds, ProviderId::OpenAi, key).unwrap_err();
            match err {
                AnalysisError::Provider { provider, cause } => {
                    assert_eq!(provider, ProviderId::OpenAi);
                    assert!(cause.contains(key));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_require_credential_trims_value() {
        let creds = StaticCredentials::with(&[("KEY", " sk-123 \n")]);
        assert_eq!(require_credential(&creds, ProviderId::Claude, "KEY").unwrap(), "sk-123");
    }

    #[test]
    fn test_credential_or_falls_back() {
        let creds = StaticCredentials::with(&[("SET", "value"), ("EMPTY", "")]);
        assert_eq!(credential_or(&creds, "SET", "d"), "value");
        assert_eq!(credential_or(&creds, "EMPTY", "d"), "d");
        assert_eq!(credential_or(&creds, "UNSET", "d"), "d");
    }

    #[test]
    fn test_remote_error_message_shapes() {
        assert_eq!(
            remote_error_message(r#"{"type":"error","error":{"type":"overloaded","message":"Overloaded"}}"#),
            Some("Overloaded".to_string())
        );
        assert_eq!(
            remote_error_message(r#"{"error":"model 'llama3' not found"}"#),
            Some("model 'llama3' not found".to_string())
        );
        assert_eq!(remote_error_message("<html>bad gateway</html>"), None);
        assert_eq!(remote_error_message(r#"{"detail":"nope"}"#), None);
    }

    #[test]
    fn test_non_empty_rejects_blank_reply() {
        assert!(non_empty(ProviderId::Gemini, None).is_err());
        assert!(non_empty(ProviderId::Gemini, Some("  \n".to_string())).is_err());
        assert_eq!(
            non_empty(ProviderId::Gemini, Some("{}".to_string())).unwrap(),
            "{}"
        );
    }

    #[test]
    fn test_registry_resolves_every_provider_to_its_adapter() {
        let http = Client::new();
        let registry = ProviderRegistry::with_credentials(http, Arc::new(StaticCredentials::default()));
        for provider in ProviderId::ALL {
            assert_eq!(registry.adapter(provider).id(), provider);
        }
    }
}
