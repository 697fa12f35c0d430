//! Per-call generation parameters and the completion result.

use crate::config::llm_model_config::LlmModelConfig;

/// Caller-supplied overrides for one generation request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerateParams {
    /// Requested output budget; clamped to the profile's `max_tokens`.
    pub max_tokens: Option<u32>,
    /// Requested sampling temperature; falls back to the profile default.
    pub temperature: Option<f32>,
}

impl GenerateParams {
    /// Effective `max_tokens`: the smaller of the request and the profile bound.
    pub fn effective_max_tokens(&self, cfg: &LlmModelConfig) -> Option<u32> {
        match (self.max_tokens, cfg.max_tokens) {
            (Some(req), Some(cap)) => Some(req.min(cap)),
            (Some(req), None) => Some(req),
            (None, cap) => cap,
        }
    }

    /// Effective temperature, clamped to the `0.0..=2.0` range providers accept.
    pub fn effective_temperature(&self, cfg: &LlmModelConfig) -> Option<f32> {
        self.temperature
            .or(cfg.temperature)
            .map(|t| if t.is_finite() { t.clamp(0.0, 2.0) } else { 0.0 })
    }
}

/// Text produced by a provider plus token accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Total tokens reported by the provider, `0` when unavailable.
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmProvider;

    fn cfg(max: Option<u32>, temp: Option<f32>) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-4".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("k".into()),
            max_tokens: max,
            temperature: temp,
            top_p: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn request_cannot_exceed_profile_bound() {
        let p = GenerateParams {
            max_tokens: Some(5000),
            temperature: None,
        };
        assert_eq!(p.effective_max_tokens(&cfg(Some(1000), None)), Some(1000));
        let p = GenerateParams {
            max_tokens: Some(200),
            temperature: None,
        };
        assert_eq!(p.effective_max_tokens(&cfg(Some(1000), None)), Some(200));
        assert_eq!(
            GenerateParams::default().effective_max_tokens(&cfg(Some(1000), None)),
            Some(1000)
        );
    }

    #[test]
    fn temperature_falls_back_and_clamps() {
        let c = cfg(None, Some(0.7));
        assert_eq!(GenerateParams::default().effective_temperature(&c), Some(0.7));
        let p = GenerateParams {
            max_tokens: None,
            temperature: Some(3.5),
        };
        assert_eq!(p.effective_temperature(&c), Some(2.0));
    }
}
