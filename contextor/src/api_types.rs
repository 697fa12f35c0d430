//! Public API types re-used by external crates (e.g., the HTTP API layer).

use rag_store::{IndexKind, IndexStats, ScoredFragment, normalize};
use serde::Serialize;

/// Characters kept in a context preview.
pub const PREVIEW_CHARS: usize = 200;

/// A question plus per-request generation knobs.
///
/// `None` fields fall back to the configured defaults.
///
/// # Example
/// ```
/// use contextor::Query;
/// let q = Query::new("How do I authenticate?");
/// assert!(q.top_k.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub question: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_k: Option<usize>,
}

impl Query {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }
}

/// Resolved generation parameters handed to a backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    pub temperature: f32,
}

/// What a generation backend returns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Distinct `doc_id`s of the fragments passed in, in first-seen order.
    pub sources: Vec<String>,
    /// Provider-reported usage, `0` when unavailable.
    pub token_count: u64,
    /// Leading context fragments the backend actually used.
    #[serde(skip)]
    pub context_used: usize,
}

/// A compact record of a context fragment that was fed to the backend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsedFragment {
    pub doc_id: String,
    pub position: usize,
    pub relevance_score: f32,
    pub content_preview: String,
}

impl From<&ScoredFragment> for UsedFragment {
    fn from(h: &ScoredFragment) -> Self {
        Self {
            doc_id: h.fragment.doc_id.clone(),
            position: h.fragment.position,
            relevance_score: h.score,
            content_preview: normalize::preview(&h.fragment.text, PREVIEW_CHARS),
        }
    }
}

/// Final answer together with the context passed to the backend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QaAnswer {
    pub answer: Answer,
    pub context: Vec<UsedFragment>,
    pub model_used: String,
}

/// Outcome of one ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub chunks_created: usize,
    /// Whether fragments of a previous upload were replaced.
    pub replaced: bool,
}

/// Index counters plus the active variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub index: IndexStats,
    pub backend: IndexKind,
}

/// Combined health of the index and the generation backend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    /// `healthy` when both parts are reachable, otherwise `degraded`.
    pub status: &'static str,
    pub version: &'static str,
    pub vector_store_status: String,
    pub llm_status: String,
}

/// Distinct `doc_id`s in first-seen order.
pub fn sources_of(context: &[ScoredFragment]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for h in context {
        if !out.iter().any(|s| s == &h.fragment.doc_id) {
            out.push(h.fragment.doc_id.clone());
        }
    }
    out
}
