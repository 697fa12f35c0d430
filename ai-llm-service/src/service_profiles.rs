//! Shared LLM service with two profiles: `generation` and an optional `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (endpoint+model+key+timeout).
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{GenerateParams, LlmModelConfig, LlmProvider, LlmServiceProfiles};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generation = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "qwen3:14b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     max_tokens: Some(512),
//!     temperature: Some(0.7),
//!     top_p: Some(0.9),
//!     timeout_secs: Some(30),
//! };
//!
//! let svc = Arc::new(LlmServiceProfiles::new(generation, None, Some(10))?);
//! let out = svc.generate("Hello", None, &GenerateParams::default()).await?;
//! println!("{}", out.text);
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    completion::{Completion, GenerateParams},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Generation and embedding profiles plus a per-config client cache.
#[derive(Debug)]
pub struct LlmServiceProfiles {
    generation: LlmModelConfig,
    embedding: Option<LlmModelConfig>,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates the service.
    ///
    /// - `generation`: profile used to answer questions.
    /// - `embedding`: profile used by [`embed`](Self::embed); `None` when no
    ///   remote embedder is configured.
    /// - `health_timeout_secs`: default timeout for health probes.
    pub fn new(
        generation: LlmModelConfig,
        embedding: Option<LlmModelConfig>,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        if generation.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        Ok(Self {
            generation,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Generates a completion with the generation profile.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        params: &GenerateParams,
    ) -> Result<Completion, AiLlmError> {
        let cfg = &self.generation;
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = self.ollama_client(cfg).await?;
                cli.generate(prompt, system, params).await
            }
            LlmProvider::OpenAI => {
                let cli = self.openai_client(cfg).await?;
                cli.generate(prompt, system, params).await
            }
        }
    }

    /// Computes an embedding with the embedding profile.
    ///
    /// # Errors
    /// [`ConfigError::MissingVar`] when no embedding profile was configured.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let cfg = self
            .embedding
            .as_ref()
            .ok_or(ConfigError::MissingVar("EMBEDDING_MODEL"))?;
        match cfg.provider {
            LlmProvider::Ollama => self.ollama_client(cfg).await?.embeddings(input).await,
            LlmProvider::OpenAI => self.openai_client(cfg).await?.embeddings(input).await,
        }
    }

    /// Health snapshot for every distinct profile.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = vec![self.generation.clone()];
        if let Some(emb) = &self.embedding {
            if emb != &self.generation {
                list.push(emb.clone());
            }
        }
        self.health.check_many(&list).await
    }

    pub fn generation_profile(&self) -> &LlmModelConfig {
        &self.generation
    }

    pub fn embedding_profile(&self) -> Option<&LlmModelConfig> {
        self.embedding.as_ref()
    }

    /* --------------------- Internals --------------------- */

    async fn ollama_client(&self, cfg: &LlmModelConfig) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        debug!(model = %cfg.model, "initializing ollama client");
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn openai_client(&self, cfg: &LlmModelConfig) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        debug!(model = %cfg.model, "initializing openai client");
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Cache key identifying a unique client config.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "llama3".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: Some(256),
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[tokio::test]
    async fn embed_without_profile_is_config_error() {
        let svc = LlmServiceProfiles::new(ollama(), None, Some(1)).unwrap();
        let err = svc.embed("x").await.unwrap_err();
        assert!(matches!(err, AiLlmError::Config(ConfigError::MissingVar(_))));
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc = LlmServiceProfiles::new(ollama(), None, Some(1)).unwrap();
        let a = svc.ollama_client(&ollama()).await.unwrap();
        let b = svc.ollama_client(&ollama()).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut cfg = ollama();
        cfg.model = " ".into();
        assert!(LlmServiceProfiles::new(cfg, None, None).is_err());
    }
}
