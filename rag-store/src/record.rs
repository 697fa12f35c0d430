//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Document / fragment metadata: string keys to scalar JSON values.
pub type Metadata = BTreeMap<String, Value>;

/// An uploaded document before chunking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A contiguous slice of one document, stored and searched as a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub doc_id: String,
    /// Position within the owning document (0-based).
    pub position: usize,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A fragment paired with its relevance score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub score: f32,
}

/// Ranked hits, highest score first.
///
/// Only constructed through [`crate::rank`], which guarantees the order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    hits: Vec<ScoredFragment>,
}

impl RetrievalResult {
    pub(crate) fn from_sorted(hits: Vec<ScoredFragment>) -> Self {
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredFragment> {
        self.hits.iter()
    }

    pub fn hits(&self) -> &[ScoredFragment] {
        &self.hits
    }

    /// Keeps hits matching `keep`; order is preserved.
    pub fn retain(&mut self, keep: impl FnMut(&ScoredFragment) -> bool) {
        self.hits.retain(keep);
    }

    pub fn truncate(&mut self, k: usize) {
        self.hits.truncate(k);
    }

    pub fn into_inner(self) -> Vec<ScoredFragment> {
        self.hits
    }
}

impl IntoIterator for RetrievalResult {
    type Item = ScoredFragment;
    type IntoIter = std::vec::IntoIter<ScoredFragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

/// Whether `doc_id` currently holds exactly `fresh`, in order.
///
/// Lets an index skip identical re-uploads so ingestion order (and with it
/// tie-breaking) stays as it was.
pub(crate) fn holds_exactly<'a>(
    stored: impl IntoIterator<Item = &'a Fragment>,
    doc_id: &str,
    fresh: &[Fragment],
) -> bool {
    let mut current = stored.into_iter().filter(|f| f.doc_id == doc_id);
    let mut incoming = fresh.iter();
    loop {
        match (current.next(), incoming.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) if a == b => {}
            _ => return false,
        }
    }
}

/// Corpus counters reported by `/stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub fragment_count: usize,
    pub document_count: usize,
}
