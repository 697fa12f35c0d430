//! Embedding executor with concurrency, per-call timeouts and dimension checks.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::{embed::EmbeddingsProvider, errors::RagError};

/// Embeds `texts` concurrently and returns vectors in input order.
///
/// # Arguments
/// - `provider`: embedding backend.
/// - `expected_dim`: enforced vector size (error on mismatch).
/// - `concurrency`: maximum number of in-flight embedding calls.
/// - `timeout`: deadline applied to each call separately.
///
/// # Errors
/// The first failure wins: [`RagError::Timeout`], [`RagError::VectorSizeMismatch`],
/// or the provider's own error. Nothing is returned partially.
pub async fn embed_all(
    texts: &[String],
    provider: &dyn EmbeddingsProvider,
    expected_dim: usize,
    concurrency: usize,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, RagError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    debug!(
        total = texts.len(),
        concurrency,
        embedder = provider.name(),
        "embed_all"
    );

    let mut results: Vec<(usize, Vec<f32>)> = stream::iter(texts.iter().cloned().enumerate())
        .map(|(i, text)| async move {
            let v = embed_one(provider, &text, expected_dim, timeout).await?;
            Ok::<(usize, Vec<f32>), RagError>((i, v))
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, RagError>>()?;

    results.sort_by_key(|(i, _)| *i);
    Ok(results.into_iter().map(|(_, v)| v).collect())
}

/// Single embedding call with timeout and dimension check.
pub async fn embed_one(
    provider: &dyn EmbeddingsProvider,
    text: &str,
    expected_dim: usize,
    timeout: Duration,
) -> Result<Vec<f32>, RagError> {
    let v = tokio::time::timeout(timeout, provider.embed(text))
        .await
        .map_err(|_| RagError::Timeout(timeout))??;
    if v.len() != expected_dim {
        return Err(RagError::VectorSizeMismatch {
            got: v.len(),
            want: expected_dim,
        });
    }
    Ok(v)
}
