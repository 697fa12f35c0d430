//! Adjacent-fragment deduplication over ranked hits.

use rag_store::RetrievalResult;

/// Drops a hit when an already kept hit comes from the same document, sits
/// right next to it (`|position diff| == 1`) and scores within `tolerance`.
///
/// Walks hits in rank order, so the higher-ranked neighbour survives.
/// Distinct sections of one document are kept even with equal scores.
pub fn dedup_adjacent(hits: &mut RetrievalResult, tolerance: f32) {
    let mut kept: Vec<(String, usize, f32)> = Vec::with_capacity(hits.len());
    hits.retain(|h| {
        let f = &h.fragment;
        let redundant = kept.iter().any(|(doc, pos, score)| {
            doc == &f.doc_id && pos.abs_diff(f.position) == 1 && (score - h.score).abs() <= tolerance
        });
        if !redundant {
            kept.push((f.doc_id.clone(), f.position, h.score));
        }
        !redundant
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{Fragment, IndexConfig, IndexKind, open_index};

    async fn ranked(docs: Vec<(&str, Vec<&str>)>, q: &str) -> RetrievalResult {
        let idx = open_index(&IndexConfig::new_default(IndexKind::Lexical), None).unwrap();
        for (doc, texts) in docs {
            let frags = texts
                .iter()
                .enumerate()
                .map(|(i, t)| Fragment {
                    doc_id: doc.to_string(),
                    position: i,
                    text: t.to_string(),
                    metadata: Default::default(),
                })
                .collect();
            idx.add(doc, frags).await.unwrap();
        }
        let v = idx.vectorize(q).await.unwrap();
        idx.search(&v, 10).await.unwrap()
    }

    #[tokio::test]
    async fn adjacent_near_duplicates_collapse() {
        let mut hits = ranked(
            vec![("d", vec!["token refresh flow", "token refresh flow", "other words here"])],
            "token refresh",
        )
        .await;
        assert_eq!(hits.iter().filter(|h| h.score > 0.0).count(), 2);
        dedup_adjacent(&mut hits, 0.02);
        let positions: Vec<usize> = hits.iter().filter(|h| h.score > 0.0).map(|h| h.fragment.position).collect();
        assert_eq!(positions, vec![0]);
    }

    #[tokio::test]
    async fn distant_sections_and_other_docs_survive() {
        let mut hits = ranked(
            vec![
                ("d", vec!["token refresh flow", "unrelated middle", "token refresh flow"]),
                ("e", vec!["token refresh flow"]),
            ],
            "token refresh",
        )
        .await;
        dedup_adjacent(&mut hits, 0.02);
        let kept: Vec<(String, usize)> = hits
            .iter()
            .filter(|h| h.score > 0.0)
            .map(|h| (h.fragment.doc_id.clone(), h.fragment.position))
            .collect();
        assert_eq!(kept, vec![("d".into(), 0), ("d".into(), 2), ("e".into(), 0)]);
    }
}
