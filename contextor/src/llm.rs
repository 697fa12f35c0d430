//! Generation backends: the contract plus the live provider variant.

use std::sync::Arc;

use ai_llm_service::{GenerateParams, LlmServiceProfiles};
use async_trait::async_trait;
use rag_store::ScoredFragment;
use tracing::{debug, instrument};

use crate::api_types::{Answer, GenerationParams, sources_of};
use crate::error::ContextorError;
use crate::prompt;

/// Turns a question and its ranked context into an [`Answer`].
///
/// The variant is chosen once at construction; callers only see the trait.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Model identifier reported back to callers.
    fn model_name(&self) -> &str;

    /// Produces an answer. `sources` must list the distinct `doc_id`s of the
    /// first `context_used` fragments of `context`, in rank order.
    async fn generate(
        &self,
        question: &str,
        context: &[ScoredFragment],
        params: &GenerationParams,
    ) -> Result<Answer, ContextorError>;

    /// Reachability without a full generation: `(ok, status message)`.
    async fn health(&self) -> (bool, String);

    /// Whether a timed-out call may be retried.
    fn timeout_retryable(&self) -> bool;
}

/// Calls the configured provider through the shared [`LlmServiceProfiles`].
pub struct LiveBackend {
    svc: Arc<LlmServiceProfiles>,
    max_ctx_chars: usize,
}

impl LiveBackend {
    pub fn new(svc: Arc<LlmServiceProfiles>, max_ctx_chars: usize) -> Self {
        Self { svc, max_ctx_chars }
    }
}

#[async_trait]
impl GenerationBackend for LiveBackend {
    fn model_name(&self) -> &str {
        &self.svc.generation_profile().model
    }

    #[instrument(skip_all, fields(model = %self.model_name(), fragments = context.len()))]
    async fn generate(
        &self,
        question: &str,
        context: &[ScoredFragment],
        params: &GenerationParams,
    ) -> Result<Answer, ContextorError> {
        let user = prompt::build_user_prompt(question, context, self.max_ctx_chars);
        let used = &context[..user.included];
        let gp = GenerateParams {
            max_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature),
        };

        let out = self
            .svc
            .generate(&user.text, Some(prompt::SYSTEM_PROMPT), &gp)
            .await
            .map_err(ContextorError::from_generation)?;

        debug!(
            tokens = out.total_tokens,
            used = used.len(),
            dropped = context.len() - used.len(),
            "live generation done"
        );
        Ok(Answer {
            text: out.text,
            sources: sources_of(used),
            token_count: out.total_tokens,
            context_used: used.len(),
        })
    }

    async fn health(&self) -> (bool, String) {
        let statuses = self.svc.health_all().await;
        let ok = !statuses.is_empty() && statuses.iter().all(|s| s.ok);
        let msg = statuses
            .iter()
            .map(|s| {
                let model = s.model.as_deref().unwrap_or("-");
                format!("{} {} ({}): {}", s.provider, model, s.endpoint, s.message)
            })
            .collect::<Vec<_>>()
            .join("; ");
        (ok, msg)
    }

    fn timeout_retryable(&self) -> bool {
        true
    }
}
