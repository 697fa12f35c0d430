//! Dense embedding index.
//!
//! Fragments are embedded independently, outside of any lock, so ingests of
//! different documents run in parallel. Only the final swap of a document's
//! fragments takes the write lock.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{IndexConfig, IndexKind};
use crate::embed::EmbeddingsProvider;
use crate::embed_pool;
use crate::errors::{RagError, Result};
use crate::index::{QueryVector, VectorIndex};
use crate::io_jsonl::{Snapshot, SnapshotRow};
use crate::rank;
use crate::record::{self, Fragment, IndexStats, RetrievalResult};

pub const SNAPSHOT_FILE: &str = "dense_fragments.jsonl";

#[derive(Clone, Debug)]
struct Entry {
    seq: u64,
    fragment: Fragment,
    vector: Vec<f32>,
}

#[derive(Clone, Debug, Default)]
struct State {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl State {
    fn replace(&mut self, doc_id: &str, fresh: Vec<(Fragment, Vec<f32>)>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.fragment.doc_id != doc_id);
        let removed = before - self.entries.len();
        for (fragment, vector) in fresh {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.entries.push(Entry {
                seq,
                fragment,
                vector,
            });
        }
        removed
    }

    fn rows(&self) -> Vec<SnapshotRow> {
        self.entries
            .iter()
            .map(|e| SnapshotRow {
                seq: e.seq,
                fragment: e.fragment.clone(),
                vector: Some(e.vector.clone()),
            })
            .collect()
    }
}

/// In-process embedding index.
pub struct DenseIndex {
    embedder: Arc<dyn EmbeddingsProvider>,
    dim: usize,
    concurrency: usize,
    timeout: std::time::Duration,
    state: RwLock<State>,
    snapshot: Option<Snapshot>,
}

impl DenseIndex {
    /// Builds the index, restoring from `snapshot` when given.
    ///
    /// # Errors
    /// `ConfigurationMismatch` when a stored vector has a different dimension
    /// than `cfg.dim` (the snapshot came from another embedding model).
    pub fn new(
        cfg: &IndexConfig,
        embedder: Arc<dyn EmbeddingsProvider>,
        snapshot: Option<Snapshot>,
    ) -> Result<Self> {
        cfg.validate()?;

        let mut state = State::default();
        if let Some(snap) = &snapshot {
            let mut rows = snap.load()?;
            rows.sort_by_key(|r| r.seq);
            for row in rows {
                let vector = row.vector.ok_or_else(|| {
                    RagError::Parse(format!("dense snapshot row {} has no vector", row.seq))
                })?;
                if vector.len() != cfg.dim {
                    return Err(RagError::ConfigurationMismatch(format!(
                        "snapshot vector dimension {} differs from configured {}",
                        vector.len(),
                        cfg.dim
                    )));
                }
                state.next_seq = state.next_seq.max(row.seq + 1);
                state.entries.push(Entry {
                    seq: row.seq,
                    fragment: row.fragment,
                    vector,
                });
            }
            info!(fragments = state.entries.len(), "dense index restored");
        }

        Ok(Self {
            embedder,
            dim: cfg.dim,
            concurrency: cfg.embed_concurrency,
            timeout: cfg.embed_timeout,
            state: RwLock::new(state),
            snapshot,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Swaps in `fresh` for `doc_id`. With persistence the new state is written
    /// before it becomes visible, so a failed write leaves the index unchanged.
    async fn swap(&self, doc_id: &str, fresh: Vec<(Fragment, Vec<f32>)>) -> Result<usize> {
        let mut guard = self.state.write().await;
        match &self.snapshot {
            None => Ok(guard.replace(doc_id, fresh)),
            Some(snap) => {
                let mut next = guard.clone();
                let removed = next.replace(doc_id, fresh);
                snap.write(next.rows()).await?;
                *guard = next;
                Ok(removed)
            }
        }
    }
}

#[async_trait]
impl VectorIndex for DenseIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Dense
    }

    async fn vectorize(&self, text: &str) -> Result<QueryVector> {
        let v = embed_pool::embed_one(self.embedder.as_ref(), text, self.dim, self.timeout).await?;
        Ok(QueryVector::Dense(v))
    }

    async fn add(&self, doc_id: &str, fragments: Vec<Fragment>) -> Result<usize> {
        let unchanged = {
            let guard = self.state.read().await;
            record::holds_exactly(guard.entries.iter().map(|e| &e.fragment), doc_id, &fragments)
        };
        if unchanged {
            debug!(%doc_id, fragments = fragments.len(), "dense add: unchanged, no embedding calls");
            return Ok(fragments.len());
        }

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = embed_pool::embed_all(
            &texts,
            self.embedder.as_ref(),
            self.dim,
            self.concurrency,
            self.timeout,
        )
        .await?;

        let count = fragments.len();
        let removed = self
            .swap(doc_id, fragments.into_iter().zip(vectors).collect())
            .await?;
        debug!(%doc_id, added = count, removed, "dense add");
        Ok(count)
    }

    async fn remove(&self, doc_id: &str) -> Result<usize> {
        if !self.contains(doc_id).await {
            return Ok(0);
        }
        let removed = self.swap(doc_id, Vec::new()).await?;
        debug!(%doc_id, removed, "dense remove");
        Ok(removed)
    }

    async fn search(&self, query: &QueryVector, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be > 0".into()));
        }
        let QueryVector::Dense(q) = query else {
            return Err(RagError::ConfigurationMismatch(
                "lexical query passed to the dense index".into(),
            ));
        };
        if q.len() != self.dim {
            return Err(RagError::ConfigurationMismatch(format!(
                "query dimension {} differs from index dimension {}",
                q.len(),
                self.dim
            )));
        }

        let guard = self.state.read().await;
        let scored = guard
            .entries
            .iter()
            .map(|e| (rank::cosine(q, &e.vector), e.seq, &e.fragment));
        Ok(rank::top_k(scored, k))
    }

    async fn size(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn stats(&self) -> IndexStats {
        let guard = self.state.read().await;
        let docs: HashSet<&str> = guard.entries.iter().map(|e| e.fragment.doc_id.as_str()).collect();
        IndexStats {
            fragment_count: guard.entries.len(),
            document_count: docs.len(),
        }
    }

    async fn contains(&self, doc_id: &str) -> bool {
        self.state
            .read()
            .await
            .entries
            .iter()
            .any(|e| e.fragment.doc_id == doc_id)
    }

    async fn ping(&self) -> Result<()> {
        match &self.snapshot {
            Some(s) => s.ping(),
            None => Ok(()),
        }
    }

    async fn flush(&self) -> Result<()> {
        if let Some(snap) = &self.snapshot {
            let rows = self.state.read().await.rows();
            snap.write(rows).await?;
        }
        Ok(())
    }
}
