//! The vector index contract shared by the lexical and dense variants.

use async_trait::async_trait;

use crate::config::IndexKind;
use crate::errors::Result;
use crate::record::{Fragment, IndexStats, RetrievalResult};

/// A question turned into the representation of one index variant.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryVector {
    /// Raw term counts; weighted against the corpus at search time.
    Terms(Vec<(String, u32)>),
    /// Embedding of the question.
    Dense(Vec<f32>),
}

impl QueryVector {
    pub fn kind(&self) -> IndexKind {
        match self {
            QueryVector::Terms(_) => IndexKind::Lexical,
            QueryVector::Dense(_) => IndexKind::Dense,
        }
    }
}

/// Searchable fragment store.
///
/// Mutations are atomic per `doc_id`: a concurrent `search` observes either
/// the state before or after an `add`/`remove`, never a mix.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn kind(&self) -> IndexKind;

    /// Turns question text into this index's query representation.
    async fn vectorize(&self, text: &str) -> Result<QueryVector>;

    /// Replaces every fragment of `doc_id` with `fragments`.
    ///
    /// On error the index is unchanged. Returns the number of fragments stored.
    async fn add(&self, doc_id: &str, fragments: Vec<Fragment>) -> Result<usize>;

    /// Removes all fragments of `doc_id`; unknown ids remove nothing.
    async fn remove(&self, doc_id: &str) -> Result<usize>;

    /// Up to `k` fragments by similarity descending, ties by ingestion order.
    ///
    /// # Errors
    /// - `InvalidArgument` when `k == 0`
    /// - `ConfigurationMismatch` when `query` has another representation
    async fn search(&self, query: &QueryVector, k: usize) -> Result<RetrievalResult>;

    /// Number of stored fragments.
    async fn size(&self) -> usize;

    async fn stats(&self) -> IndexStats;

    async fn contains(&self, doc_id: &str) -> bool;

    /// Cheap reachability check (snapshot directory, provider wiring).
    async fn ping(&self) -> Result<()>;

    /// Writes the current state to the snapshot, if persistence is enabled.
    async fn flush(&self) -> Result<()>;
}
