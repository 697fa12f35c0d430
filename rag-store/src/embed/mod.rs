//! Embedding providers used by the dense index.
//!
//! Async is required because real providers (Ollama, OpenAI) perform HTTP
//! requests; the hashing embedder resolves immediately.

use crate::errors::RagError;
use std::{future::Future, pin::Pin};

pub mod hashing;
pub mod llm;

/// Boxed embedding future.
pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in another embedding backend.
pub trait EmbeddingsProvider: Send + Sync {
    /// Short identifier for logs and health output.
    fn name(&self) -> &str;

    /// Async embedding function.
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a>;
}
