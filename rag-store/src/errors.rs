//! Unified error types for the crate.

use std::time::Duration;

use ai_llm_service::{AiLlmError, FailureClass};
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RagError>;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Bad chunking parameters, missing embedder, zero dimension, etc.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Caller passed an unusable argument (e.g. `k = 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query representation does not match the index representation.
    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Embedding provider failure with its retry classification.
    #[error("embedding provider failed ({class}): {message}")]
    Provider { class: FailureClass, message: String },

    /// An embedding call exceeded its deadline.
    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot row could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Snapshot could not be written.
    #[error("persist error: {0}")]
    Persist(String),
}

impl RagError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Timeout(_) => true,
            RagError::Provider { class, .. } => class.is_retryable(),
            _ => false,
        }
    }
}

impl From<AiLlmError> for RagError {
    fn from(e: AiLlmError) -> Self {
        match e {
            AiLlmError::Timeout(d) => RagError::Timeout(d),
            other => RagError::Provider {
                class: other.classify(),
                message: other.to_string(),
            },
        }
    }
}
