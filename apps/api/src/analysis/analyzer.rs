//! Resume analysis pipeline.
//!
//! Flow: resolve resume text → validate → build prompt → resolve provider →
//!       invoke exactly one adapter → normalize → return.
//!
//! No retries and no fallback to another provider; callers decide whether to
//! try again. The analyzer holds no per-call state, so one instance serves any
//! number of concurrent requests.

use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::analysis::extract::extract;
use crate::analysis::normalize::normalize;
use crate::analysis::prompts::build_prompt;
use crate::analysis::providers::ProviderRegistry;
use crate::analysis::{AnalysisError, AnalysisRequest, AnalysisResult, ProviderId, ResumeSource};

#[derive(Clone)]
pub struct Analyzer {
    providers: ProviderRegistry,
}

impl Analyzer {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    /// Runs one analysis. `cancel` is threaded down to the outbound HTTP call.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let AnalysisRequest {
            resume,
            job_description,
            provider,
        } = request;

        // 1. Resume text
        let resume_text = resolve_resume_text(resume).await?;

        // 2. Validation
        if job_description.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "job description is required for AI analysis".to_string(),
            ));
        }
        if resume_text.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "resume contains no text".to_string(),
            ));
        }

        // 3. Prompt
        let prompt = build_prompt(&resume_text, &job_description);

        // 4. Provider
        let provider_id: ProviderId = provider.parse()?;
        let adapter = self.providers.adapter(provider_id);

        // 5. Invoke
        info!(
            "Requesting resume analysis from {provider_id} ({} prompt chars)",
            prompt.len()
        );
        let raw = adapter.invoke(&prompt, cancel).await?;
        debug!("{provider_id} replied with {} chars", raw.len());

        // 6. Normalize
        let result = normalize(&raw).inspect_err(|e| {
            if let AnalysisError::MalformedResponse { raw, reason } = e {
                warn!("{provider_id} returned a malformed analysis ({reason}): {raw}");
            }
        })?;

        info!("Resume analysis from {provider_id} scored {}", result.score);
        Ok(result)
    }
}

/// Text passes through; documents are extracted on the blocking pool since
/// PDF parsing is CPU-bound.
async fn resolve_resume_text(resume: ResumeSource) -> Result<String, AnalysisError> {
    match resume {
        ResumeSource::Text(text) => Ok(text),
        ResumeSource::Document(document) => {
            tokio::task::spawn_blocking(move || extract(&document))
                .await
                .map_err(|e| AnalysisError::ExtractionFailed(format!("extraction task failed: {e}")))?
        }
    }
}

/// A token that cancels itself once `timeout` elapses, or when the returned
/// guard is dropped.
pub fn deadline_token(timeout: Duration) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                debug!("Analysis deadline of {}s reached, cancelling", timeout.as_secs());
                timer.cancel();
            }
            _ = timer.cancelled() => {}
        }
    });
    let guard = token.clone().drop_guard();
    (token, guard)
}
