//! Default LLM configs loaded strictly from environment variables.
//!
//! Convenience constructors for [`LlmModelConfig`], grouped by provider and
//! role. Two roles exist:
//!
//! - **Generation** → chat model answering questions
//! - **Embedding**  → embedding model for the dense index
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_MAX_TOKENS`          = upper bound for generated tokens (u32, default 1000)
//! - `LLM_TEMPERATURE`         = default temperature (f32, default 0.7)
//! - `GENERATION_TIMEOUT_SECS` = chat request timeout (default 60)
//! - `EMBEDDING_TIMEOUT_SECS`  = embedding request timeout (default 30)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY`          = API key (mandatory)
//! - `OPENAI_URL`              = base URL (default `https://api.openai.com`)
//! - `OPENAI_MODEL`            = chat model (default `gpt-4`)
//! - `OPENAI_EMBEDDING_MODEL`  = embedding model (default `text-embedding-3-small`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = chat model (mandatory)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory for embeddings)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, must_env, validate_http_endpoint,
        validate_range_f32,
    },
};

const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Builds the generation profile for `provider`.
pub fn generation_config(provider: LlmProvider) -> Result<LlmModelConfig, AiLlmError> {
    match provider {
        LlmProvider::OpenAI => config_openai_chat(),
        LlmProvider::Ollama => config_ollama_chat(),
    }
}

/// Builds the embedding profile for `provider`.
pub fn embedding_config(provider: LlmProvider) -> Result<LlmModelConfig, AiLlmError> {
    match provider {
        LlmProvider::OpenAI => config_openai_embedding(),
        LlmProvider::Ollama => config_ollama_embedding(),
    }
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            validate_http_endpoint("OLLAMA_URL", &url)?;
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{}", port.trim()));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn openai_endpoint() -> Result<String, AiLlmError> {
    let url = std::env::var("OPENAI_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &url)?;
    Ok(url)
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn timeout_secs(var: &'static str, default: u32) -> Result<u64, AiLlmError> {
    Ok(u64::from(env_opt_u32(var)?.unwrap_or(default)))
}

fn generation_knobs() -> Result<(u32, f32), AiLlmError> {
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return Err(ConfigError::OutOfRange {
            field: "LLM_MAX_TOKENS",
            detail: "must be > 0",
        }
        .into());
    }
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
    validate_range_f32("LLM_TEMPERATURE", temperature, 0.0, 2.0)?;
    Ok((max_tokens, temperature))
}

/// Constructs the OpenAI chat profile.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `OPENAI_MODEL`, `OPENAI_URL`, `LLM_MAX_TOKENS`, `LLM_TEMPERATURE` (optional)
pub fn config_openai_chat() -> Result<LlmModelConfig, AiLlmError> {
    let (max_tokens, temperature) = generation_knobs()?;
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: env_or("OPENAI_MODEL", "gpt-4"),
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(timeout_secs("GENERATION_TIMEOUT_SECS", 60)?),
    })
}

/// Constructs the OpenAI embedding profile.
///
/// # Defaults
/// - `model = text-embedding-3-small`
/// - `temperature = None` (not applicable)
pub fn config_openai_embedding() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: env_or("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(timeout_secs("EMBEDDING_TIMEOUT_SECS", 30)?),
    })
}

/// Constructs the Ollama chat profile.
///
/// # Env
/// - `OLLAMA_MODEL` (required)
/// - `LLM_MAX_TOKENS`, `LLM_TEMPERATURE` (optional)
pub fn config_ollama_chat() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;
    let (max_tokens, temperature) = generation_knobs()?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(timeout_secs("GENERATION_TIMEOUT_SECS", 60)?),
    })
}

/// Constructs the Ollama embedding profile.
///
/// # Env
/// - `EMBEDDING_MODEL` (required)
pub fn config_ollama_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("EMBEDDING_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(timeout_secs("EMBEDDING_TIMEOUT_SECS", 30)?),
    })
}
