//! Similarity and ranking helpers shared by both index variants.

use std::cmp::Ordering;

use crate::record::{Fragment, RetrievalResult, ScoredFragment};

/// Cosine similarity. Zero vectors and length mismatches score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0f32;
    let mut na = 0f32;
    let mut nb = 0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Orders `(score, seq, fragment)` candidates by score descending, then by
/// ingestion sequence ascending, and keeps the first `k`. NaN scores are dropped.
pub fn top_k<'a>(
    candidates: impl IntoIterator<Item = (f32, u64, &'a Fragment)>,
    k: usize,
) -> RetrievalResult {
    let mut all: Vec<(f32, u64, &Fragment)> = candidates
        .into_iter()
        .filter(|(s, _, _)| !s.is_nan())
        .collect();

    all.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
    all.truncate(k);

    RetrievalResult::from_sorted(
        all.into_iter()
            .map(|(score, _, f)| ScoredFragment {
                fragment: f.clone(),
                score,
            })
            .collect(),
    )
}
