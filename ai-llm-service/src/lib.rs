//! Shared LLM access for the documentation assistant.
//!
//! - [`services`]: thin OpenAI / Ollama HTTP clients (chat + embeddings)
//! - [`service_profiles`]: one long-lived facade with `generation` and
//!   `embedding` profiles, shared via `Arc`
//! - [`health_service`]: cheap reachability probes that never fail
//! - [`error_handler`]: unified [`AiLlmError`] with a retry-oriented
//!   [`FailureClass`]
//! - [`telemetry`]: formatting layer for the binary's subscriber

pub mod completion;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use completion::{Completion, GenerateParams};
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, FailureClass};
pub use health_service::{HealthService, HealthStatus};
pub use service_profiles::LlmServiceProfiles;
