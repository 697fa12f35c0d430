//! Runtime configuration loaded from environment variables.

use std::{path::PathBuf, str::FromStr, time::Duration};

use ai_llm_service::LlmProvider;
use rag_store::{IndexConfig, IndexKind};

use crate::error::ContextorError;

/// Which generation backend answers questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmBackend {
    /// Deterministic offline answers.
    Mock,
    /// A live provider through `ai-llm-service`.
    Live(LlmProvider),
}

impl FromStr for LlmBackend {
    type Err = ContextorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("mock") {
            return Ok(LlmBackend::Mock);
        }
        s.parse::<LlmProvider>()
            .map(LlmBackend::Live)
            .map_err(|e| ContextorError::InvalidConfiguration(format!("LLM_BACKEND: {e}")))
    }
}

/// Embedder used by the dense index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Provider embedding endpoint (network call per fragment).
    Llm,
    /// Offline feature hashing.
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = ContextorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" | "provider" => Ok(Self::Llm),
            "hashing" | "hash" => Ok(Self::Hashing),
            other => Err(ContextorError::InvalidConfiguration(format!(
                "EMBEDDING_BACKEND: unknown value `{other}` (expected llm|hashing)"
            ))),
        }
    }
}

/// Config bag for the pipeline. All fields have defaults via `new_default`.
#[derive(Clone, Debug)]
pub struct RagSettings {
    // Chunking
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    // Retrieval knobs
    pub top_k: usize,
    pub score_floor: f32,
    pub dedup_tolerance: f32,
    pub max_ctx_chars: usize,

    // Generation defaults
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    pub generation_timeout: Duration,

    pub index: IndexConfig,
    pub llm_backend: LlmBackend,
    pub embedding_backend: EmbeddingBackend,
}

impl RagSettings {
    /// Defaults with the given index kind and the mock backend.
    pub fn new_default(kind: IndexKind) -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            score_floor: 0.05,
            dedup_tolerance: 0.02,
            max_ctx_chars: 8000,
            default_max_tokens: 1000,
            default_temperature: 0.7,
            generation_timeout: Duration::from_secs(60),
            index: IndexConfig::new_default(kind),
            llm_backend: LlmBackend::Mock,
            embedding_backend: EmbeddingBackend::Hashing,
        }
    }

    /// Build from environment variables, then validate.
    ///
    /// # Errors
    /// [`ContextorError::InvalidConfiguration`] for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self, ContextorError> {
        let kind: IndexKind = env("INDEX_BACKEND", "lexical")
            .parse()
            .map_err(|e: rag_store::RagError| ContextorError::InvalidConfiguration(e.to_string()))?;
        let llm_backend: LlmBackend = env("LLM_BACKEND", "mock").parse()?;
        // Offline hashing unless a live provider is configured.
        let default_embedder = match llm_backend {
            LlmBackend::Mock => "hashing",
            LlmBackend::Live(_) => "llm",
        };
        let embedding_backend: EmbeddingBackend =
            env("EMBEDDING_BACKEND", default_embedder).parse()?;

        let default_dim = match embedding_backend {
            EmbeddingBackend::Llm => 1536,
            EmbeddingBackend::Hashing => rag_store::embed::hashing::DEFAULT_HASHING_DIM,
        };

        let index = IndexConfig {
            kind,
            dim: parse("EMBEDDING_DIM", default_dim)?,
            embed_concurrency: parse("EMBEDDING_CONCURRENCY", 4usize)?,
            embed_timeout: Duration::from_secs(parse("EMBEDDING_TIMEOUT_SECS", 30u64)?),
            store_dir: std::env::var("VECTOR_STORE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        let cfg = Self {
            chunk_size: parse("CHUNK_SIZE", 1000usize)?,
            chunk_overlap: parse("CHUNK_OVERLAP", 200usize)?,
            top_k: parse("RAG_TOP_K", 5usize)?,
            score_floor: parse("SCORE_FLOOR", 0.05f32)?,
            dedup_tolerance: parse("DEDUP_TOLERANCE", 0.02f32)?,
            max_ctx_chars: parse("MAX_CTX_CHARS", 8000usize)?,
            default_max_tokens: parse("LLM_MAX_TOKENS", 1000u32)?,
            default_temperature: parse("LLM_TEMPERATURE", 0.7f32)?,
            generation_timeout: Duration::from_secs(parse("GENERATION_TIMEOUT_SECS", 60u64)?),
            index,
            llm_backend,
            embedding_backend,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ContextorError> {
        rag_store::chunker::validate(self.chunk_size, self.chunk_overlap)?;
        self.index.validate()?;
        if self.top_k == 0 {
            return invalid("RAG_TOP_K must be > 0");
        }
        if !self.score_floor.is_finite() {
            return invalid("SCORE_FLOOR must be finite");
        }
        if self.dedup_tolerance.is_nan() || self.dedup_tolerance < 0.0 {
            return invalid("DEDUP_TOLERANCE must be >= 0");
        }
        if self.max_ctx_chars == 0 {
            return invalid("MAX_CTX_CHARS must be > 0");
        }
        if self.default_max_tokens == 0 {
            return invalid("LLM_MAX_TOKENS must be > 0");
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return invalid("LLM_TEMPERATURE must be within 0..=2");
        }
        if self.generation_timeout.is_zero() {
            return invalid("GENERATION_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Result<(), ContextorError> {
    Err(ContextorError::InvalidConfiguration(msg.to_string()))
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

/// Parses `k` when set; unset or empty means `dflt`, garbage is an error.
fn parse<T: FromStr>(k: &str, dflt: T) -> Result<T, ContextorError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| {
            ContextorError::InvalidConfiguration(format!("{k}: cannot parse `{v}`"))
        }),
        _ => Ok(dflt),
    }
}
