//! Embeddings through the shared LLM service (Ollama or OpenAI embedding profile).

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use tracing::warn;

use crate::embed::{EmbedFuture, EmbeddingsProvider};
use crate::errors::RagError;

/// Remote embedder backed by [`LlmServiceProfiles::embed`].
#[derive(Clone, Debug)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    name: String,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        let name = svc
            .embedding_profile()
            .map(|p| format!("{}:{}", p.provider, p.model))
            .unwrap_or_else(|| "unconfigured".to_string());
        Self { svc, name }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        Box::pin(async move {
            self.svc.embed(text).await.map_err(|e| {
                warn!(embedder = %self.name, error = %e, "embedding request failed");
                RagError::from(e)
            })
        })
    }
}
