//! Chunking and vector indexes for documentation retrieval.
//!
//! This crate provides:
//! - [`chunker`]: overlapping, boundary-aware fragments of document text
//! - [`VectorIndex`]: one contract, two variants ([`LexicalIndex`] TF-IDF and
//!   [`DenseIndex`] embeddings), both atomic per `doc_id`
//! - [`EmbeddingsProvider`]s: remote (via `ai-llm-service`) or offline hashing
//! - optional JSONL snapshots so an index survives restarts
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

pub mod chunker;
mod config;
mod dense;
pub mod embed;
mod embed_pool;
mod errors;
mod index;
mod io_jsonl;
mod lexical;
pub mod normalize;
pub mod rank;
mod record;

use std::sync::Arc;

pub use config::{IndexConfig, IndexKind};
pub use dense::DenseIndex;
pub use embed::{EmbeddingsProvider, hashing::HashingEmbedder, llm::LlmEmbedder};
pub use errors::{RagError, Result};
pub use index::{QueryVector, VectorIndex};
pub use io_jsonl::Snapshot;
pub use lexical::LexicalIndex;
pub use record::{Document, Fragment, IndexStats, Metadata, RetrievalResult, ScoredFragment};

use tracing::info;

/// Builds the index selected by `cfg.kind`, restoring its snapshot when
/// `cfg.store_dir` is set.
///
/// # Errors
/// - `InvalidConfiguration` for invalid values or a dense index without embedder
/// - snapshot load errors (`Io`, `Parse`, `ConfigurationMismatch`)
pub fn open_index(
    cfg: &IndexConfig,
    embedder: Option<Arc<dyn EmbeddingsProvider>>,
) -> Result<Arc<dyn VectorIndex>> {
    cfg.validate()?;
    info!(kind = %cfg.kind, store_dir = ?cfg.store_dir, "opening vector index");

    match cfg.kind {
        IndexKind::Lexical => {
            let idx = match &cfg.store_dir {
                Some(dir) => LexicalIndex::with_snapshot(Snapshot::open(dir, lexical::SNAPSHOT_FILE)?)?,
                None => LexicalIndex::new()?,
            };
            Ok(Arc::new(idx))
        }
        IndexKind::Dense => {
            let embedder = embedder.ok_or_else(|| {
                RagError::InvalidConfiguration("dense index requires an embedding provider".into())
            })?;
            let snapshot = match &cfg.store_dir {
                Some(dir) => Some(Snapshot::open(dir, dense::SNAPSHOT_FILE)?),
                None => None,
            };
            Ok(Arc::new(DenseIndex::new(cfg, embedder, snapshot)?))
        }
    }
}
