//! Retriever: vectorize the question, search, floor, dedup, truncate.

use std::sync::Arc;

use rag_store::{IndexKind, RetrievalResult, VectorIndex};
use tracing::debug;

use crate::error::ContextorError;
use crate::select;

/// Over-fetch factor applied before the floor and dedup passes.
const CANDIDATE_FACTOR: usize = 3;

pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    score_floor: f32,
    dedup_tolerance: f32,
}

impl Retriever {
    /// Binds the retriever to `index`.
    ///
    /// # Errors
    /// [`ContextorError::ConfigurationMismatch`] when the index variant is not `expected`.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        expected: IndexKind,
        score_floor: f32,
        dedup_tolerance: f32,
    ) -> Result<Self, ContextorError> {
        if index.kind() != expected {
            return Err(ContextorError::ConfigurationMismatch(format!(
                "retriever configured for {expected} but index is {}",
                index.kind()
            )));
        }
        Ok(Self {
            index,
            score_floor,
            dedup_tolerance,
        })
    }

    /// Top `k` fragments scoring above the floor, adjacent near-duplicates removed.
    ///
    /// An empty result is a valid answerable state, not an error.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult, ContextorError> {
        if k == 0 {
            return Err(ContextorError::InvalidArgument("k must be > 0".into()));
        }

        let query = self.index.vectorize(question).await?;
        if query.kind() != self.index.kind() {
            return Err(ContextorError::ConfigurationMismatch(format!(
                "{} query for a {} index",
                query.kind(),
                self.index.kind()
            )));
        }

        let mut hits = self
            .index
            .search(&query, k.saturating_mul(CANDIDATE_FACTOR))
            .await?;
        let fetched = hits.len();

        hits.retain(|h| h.score > self.score_floor);
        select::dedup_adjacent(&mut hits, self.dedup_tolerance);
        hits.truncate(k);

        debug!(k, fetched, kept = hits.len(), floor = self.score_floor, "retrieve");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{Fragment, IndexConfig, open_index};

    fn lexical() -> Arc<dyn VectorIndex> {
        open_index(&IndexConfig::new_default(IndexKind::Lexical), None).unwrap()
    }

    async fn put(idx: &Arc<dyn VectorIndex>, doc: &str, texts: &[&str]) {
        let frags = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Fragment {
                doc_id: doc.into(),
                position: i,
                text: t.to_string(),
                metadata: Default::default(),
            })
            .collect();
        idx.add(doc, frags).await.unwrap();
    }

    #[test]
    fn kind_mismatch_fails_fast() {
        let err = Retriever::new(lexical(), IndexKind::Dense, 0.0, 0.0).err().unwrap();
        assert!(matches!(err, ContextorError::ConfigurationMismatch(_)));
    }

    #[tokio::test]
    async fn floor_can_empty_the_result() {
        let idx = lexical();
        put(&idx, "a", &["webhooks are signed with hmac"]).await;
        put(&idx, "b", &["pagination uses cursors"]).await;

        let r = Retriever::new(idx.clone(), IndexKind::Lexical, 0.05, 0.02).unwrap();
        assert!(r.retrieve("quantum entanglement", 3).await.unwrap().is_empty());

        let hits = r.retrieve("webhooks hmac", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.hits()[0].fragment.doc_id, "a");

        let strict = Retriever::new(idx, IndexKind::Lexical, 1.5, 0.02).unwrap();
        assert!(strict.retrieve("webhooks hmac", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncates_after_filtering_and_rejects_zero_k() {
        let idx = lexical();
        for d in ["a", "b", "c", "d"] {
            put(&idx, d, &["rate limit headers"]).await;
        }
        let r = Retriever::new(idx, IndexKind::Lexical, 0.0, 0.02).unwrap();
        let hits = r.retrieve("rate limit", 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.fragment.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(matches!(r.retrieve("rate", 0).await, Err(ContextorError::InvalidArgument(_))));
    }
}
