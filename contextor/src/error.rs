//! Typed error for the contextor crate.

use std::time::Duration;

use ai_llm_service::{AiLlmError, FailureClass};
use rag_store::RagError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Bad chunking/retrieval/generation settings. Never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Caller input out of range (e.g. `k = 0`, temperature > 2).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query and index representations differ; a deployment bug.
    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// Chunking or indexing of one document failed; the index is unchanged.
    #[error("ingestion of `{doc_id}` failed: {source}")]
    IngestionFailed {
        doc_id: String,
        #[source]
        source: RagError,
    },

    /// The generation backend failed; `kind` tells whether a retry may help.
    #[error("generation failed ({kind}): {message}")]
    GenerationFailed { kind: FailureClass, message: String },

    #[error("operation timed out after {after:?}")]
    Timeout { after: Duration, retryable: bool },

    #[error("document `{0}` not found")]
    NotFound(String),

    #[error("request cancelled")]
    Cancelled,

    /// Errors from the underlying rag-store crate during retrieval.
    #[error("retrieval error: {0}")]
    Retrieval(RagError),
}

impl ContextorError {
    /// Whether the caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            ContextorError::GenerationFailed { kind, .. } => kind.is_retryable(),
            ContextorError::Timeout { retryable, .. } => *retryable,
            ContextorError::IngestionFailed { source, .. } => source.is_retryable(),
            ContextorError::Retrieval(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Classifies a provider error raised by the live generation backend.
    pub(crate) fn from_generation(e: AiLlmError) -> Self {
        match e {
            AiLlmError::Timeout(after) => ContextorError::Timeout {
                after,
                retryable: true,
            },
            other => ContextorError::GenerationFailed {
                kind: other.classify(),
                message: other.to_string(),
            },
        }
    }
}

impl From<RagError> for ContextorError {
    fn from(e: RagError) -> Self {
        match e {
            RagError::InvalidConfiguration(m) => ContextorError::InvalidConfiguration(m),
            RagError::InvalidArgument(m) => ContextorError::InvalidArgument(m),
            RagError::ConfigurationMismatch(m) => ContextorError::ConfigurationMismatch(m),
            other => ContextorError::Retrieval(other),
        }
    }
}
