//! Health probes for the configured LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model must appear in `models[].name`
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth, model must appear in `data[].id`
//!
//! [`HealthService::check`] never fails; errors are folded into `ok = false`
//! so the result can be surfaced directly by a `/health` endpoint.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// Serializable health snapshot for a single profile.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: Option<String>,
    pub ok: bool,
    /// Latency of the probe request in milliseconds.
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker that reuses one HTTP client for every probe.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

/// Model identifiers returned by either provider's listing endpoint.
#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Option<Vec<OllamaTag>>,
}

#[derive(Deserialize)]
struct OllamaTag {
    name: String,
}

#[derive(Deserialize)]
struct OpenAiModels {
    data: Vec<OpenAiModel>,
}

#[derive(Deserialize)]
struct OpenAiModel {
    id: String,
}

impl HealthService {
    /// Creates a checker with an optional default timeout (seconds, default 10).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        debug!(default_timeout_secs = timeout.as_secs(), "health service ready");
        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Probes one profile. Any failure becomes `ok = false` with a message.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            warn!(provider = %cfg.provider, endpoint = %cfg.endpoint, "invalid endpoint");
            return HealthStatus::new(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        let start = Instant::now();
        match self.probe(cfg).await {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    model = %cfg.model,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status =
                    HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    model = %cfg.model,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Probes several profiles sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn probe(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let base = cfg.endpoint.trim_end_matches('/');
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let request = match cfg.provider {
            LlmProvider::Ollama => self.client.get(format!("{base}/api/tags")),
            LlmProvider::OpenAI => {
                let key = cfg
                    .api_key
                    .as_deref()
                    .ok_or_else(|| HealthError::Decode("missing OpenAI API key".into()))?;
                let value = header::HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;
                self.client
                    .get(format!("{base}/v1/models"))
                    .header(header::AUTHORIZATION, value)
            }
        };

        let start = Instant::now();
        let resp = request.timeout(timeout).send().await?;
        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let url = resp.url().to_string();
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        let body = resp.bytes().await?;
        let listed = model_names(&cfg.provider, &body);

        Ok(match listed {
            Ok(Some(models)) => model_status(cfg, latency, &models),
            Ok(None) => HealthStatus::new(cfg, true, latency, "reachable; no model list returned"),
            Err(e) => {
                // Server answered 2xx; an unexpected body still counts as reachable.
                HealthStatus::new(cfg, true, latency, format!("reachable; undecodable model list: {e}"))
            }
        })
    }
}

/// Decodes the provider's model listing; `None` when Ollama omits `models`.
fn model_names(
    provider: &LlmProvider,
    body: &[u8],
) -> Result<Option<Vec<String>>, serde_json::Error> {
    match provider {
        LlmProvider::Ollama => serde_json::from_slice::<OllamaTags>(body)
            .map(|t| t.models.map(|m| m.into_iter().map(|x| x.name).collect::<Vec<String>>())),
        LlmProvider::OpenAI => serde_json::from_slice::<OpenAiModels>(body)
            .map(|m| Some(m.data.into_iter().map(|x| x.id).collect::<Vec<String>>())),
    }
}

fn model_status(cfg: &LlmModelConfig, latency_ms: u128, models: &[String]) -> HealthStatus {
    if models.iter().any(|m| m == &cfg.model) {
        HealthStatus::new(cfg, true, latency_ms, "healthy; model is available")
    } else {
        HealthStatus::new(cfg, false, latency_ms, "reachable, but model is not listed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "llama3".into(),
            endpoint: endpoint.into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[test]
    fn model_listing_decides_health() {
        let c = cfg("http://localhost:11434");
        assert!(model_status(&c, 3, &["llama3".into()]).ok);
        let miss = model_status(&c, 3, &["mistral".into()]);
        assert!(!miss.ok);
        assert_eq!(miss.provider, "ollama");
    }

    #[test]
    fn both_listing_shapes_decode() {
        let ollama = br#"{"models":[{"name":"llama3"},{"name":"nomic-embed-text"}]}"#;
        assert_eq!(
            model_names(&LlmProvider::Ollama, ollama).unwrap(),
            Some(vec!["llama3".to_string(), "nomic-embed-text".to_string()])
        );
        assert_eq!(model_names(&LlmProvider::Ollama, b"{}").unwrap(), None);

        let openai = br#"{"object":"list","data":[{"id":"gpt-4o-mini","object":"model"}]}"#;
        assert_eq!(
            model_names(&LlmProvider::OpenAI, openai).unwrap(),
            Some(vec!["gpt-4o-mini".to_string()])
        );
        assert!(model_names(&LlmProvider::OpenAI, b"<html>").is_err());
    }

    #[tokio::test]
    async fn invalid_endpoint_is_reported_not_raised() {
        let svc = HealthService::new(Some(1)).unwrap();
        let status = svc.check(&cfg("localhost")).await;
        assert!(!status.ok);
        assert_eq!(status.latency_ms, 0);
    }
}
