//! Lexical TF-IDF index.
//!
//! Weights are corpus-global: every `add`/`remove` recomputes the smoothed idf
//! table and all fragment vectors, an O(corpus) step. Mutations are serialized
//! by the write lock; searches share the read lock and see a consistent state.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::IndexKind;
use crate::errors::{RagError, Result};
use crate::index::{QueryVector, VectorIndex};
use crate::io_jsonl::{Snapshot, SnapshotRow};
use crate::rank;
use crate::record::{self, Fragment, IndexStats, RetrievalResult};

pub const SNAPSHOT_FILE: &str = "lexical_fragments.jsonl";

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "i",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "what", "with", "you",
];

/// Leading characters shared by the prefix feature of a word.
const PREFIX_CHARS: usize = 4;
/// Marks prefix features; never produced by the word regex.
const PREFIX_MARK: char = '~';

/// Lowercasing word tokenizer with a small stop-word list.
///
/// Every word of at least [`PREFIX_CHARS`] characters also yields a prefix
/// feature (`~auth` for `auth`, `authenticate` and `authorization`), so
/// inflected and abbreviated forms still share weight.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    word: Regex,
    stop: HashSet<&'static str>,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        let word = Regex::new(r"[\p{L}\p{N}_]+")
            .map_err(|e| RagError::InvalidConfiguration(format!("tokenizer regex: {e}")))?;
        Ok(Self {
            word,
            stop: STOP_WORDS.iter().copied().collect(),
        })
    }

    /// Term and prefix-feature counts in first-seen order.
    pub fn term_counts(&self, text: &str) -> Vec<(String, u32)> {
        let lower = text.to_lowercase();
        let mut order: Vec<(String, u32)> = Vec::new();
        let mut pos: HashMap<String, usize> = HashMap::new();
        let mut bump = |t: String| match pos.get(&t) {
            Some(&i) => order[i].1 += 1,
            None => {
                pos.insert(t.clone(), order.len());
                order.push((t, 1));
            }
        };
        for m in self.word.find_iter(&lower) {
            let t = m.as_str();
            if self.stop.contains(t) {
                continue;
            }
            bump(t.to_string());
            if t.chars().count() >= PREFIX_CHARS {
                let mut prefix = String::from(PREFIX_MARK);
                prefix.extend(t.chars().take(PREFIX_CHARS));
                bump(prefix);
            }
        }
        order
    }
}

#[derive(Clone, Debug)]
struct Entry {
    seq: u64,
    fragment: Fragment,
    terms: BTreeMap<String, u32>,
    /// L2-normalized tf-idf weights, valid for the current corpus.
    weights: BTreeMap<String, f32>,
}

#[derive(Clone, Debug, Default)]
struct State {
    entries: Vec<Entry>,
    idf: BTreeMap<String, f32>,
    next_seq: u64,
}

impl State {
    fn replace(&mut self, doc_id: &str, fresh: Vec<Entry>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.fragment.doc_id != doc_id);
        let removed = before - self.entries.len();
        self.entries.extend(fresh);
        removed
    }

    /// Smoothed idf `ln((1 + N) / (1 + df)) + 1` and normalized tf-idf per entry.
    fn recompute(&mut self) {
        let n = self.entries.len() as f32;
        let mut df: HashMap<&str, u32> = HashMap::new();
        for e in &self.entries {
            for t in e.terms.keys() {
                *df.entry(t.as_str()).or_insert(0) += 1;
            }
        }
        let idf: BTreeMap<String, f32> = df
            .into_iter()
            .map(|(t, d)| (t.to_string(), ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0))
            .collect();

        for e in &mut self.entries {
            e.weights = weigh(&e.terms, &idf);
        }
        self.idf = idf;
    }

    fn rows(&self) -> Vec<SnapshotRow> {
        self.entries
            .iter()
            .map(|e| SnapshotRow {
                seq: e.seq,
                fragment: e.fragment.clone(),
                vector: None,
            })
            .collect()
    }

    fn stats(&self) -> IndexStats {
        let docs: HashSet<&str> = self.entries.iter().map(|e| e.fragment.doc_id.as_str()).collect();
        IndexStats {
            fragment_count: self.entries.len(),
            document_count: docs.len(),
        }
    }
}

fn weigh<'a>(
    terms: impl IntoIterator<Item = (&'a String, &'a u32)>,
    idf: &BTreeMap<String, f32>,
) -> BTreeMap<String, f32> {
    let mut w: BTreeMap<String, f32> = terms
        .into_iter()
        .filter_map(|(t, c)| idf.get(t).map(|i| (t.clone(), *c as f32 * i)))
        .collect();
    let norm = w.values().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        w.values_mut().for_each(|x| *x /= norm);
    }
    w
}

/// In-process TF-IDF index.
pub struct LexicalIndex {
    tokenizer: Tokenizer,
    state: RwLock<State>,
    snapshot: Option<Snapshot>,
}

impl LexicalIndex {
    /// Empty in-memory index.
    pub fn new() -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new()?,
            state: RwLock::new(State::default()),
            snapshot: None,
        })
    }

    /// Index persisted to `snapshot`, rebuilt from its current contents.
    pub fn with_snapshot(snapshot: Snapshot) -> Result<Self> {
        let tokenizer = Tokenizer::new()?;
        let mut rows = snapshot.load()?;
        rows.sort_by_key(|r| r.seq);

        let mut state = State::default();
        for row in rows {
            state.next_seq = state.next_seq.max(row.seq + 1);
            state.entries.push(Entry {
                seq: row.seq,
                terms: tokenizer.term_counts(&row.fragment.text).into_iter().collect(),
                fragment: row.fragment,
                weights: BTreeMap::new(),
            });
        }
        state.recompute();
        info!(fragments = state.entries.len(), "lexical index restored");

        Ok(Self {
            tokenizer,
            state: RwLock::new(state),
            snapshot: Some(snapshot),
        })
    }

    async fn commit(&self, state: &State) -> Result<()> {
        match &self.snapshot {
            Some(s) => s.write(state.rows()).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorIndex for LexicalIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Lexical
    }

    async fn vectorize(&self, text: &str) -> Result<QueryVector> {
        Ok(QueryVector::Terms(self.tokenizer.term_counts(text)))
    }

    async fn add(&self, doc_id: &str, fragments: Vec<Fragment>) -> Result<usize> {
        let count = fragments.len();
        let mut guard = self.state.write().await;
        if record::holds_exactly(guard.entries.iter().map(|e| &e.fragment), doc_id, &fragments) {
            debug!(%doc_id, fragments = count, "lexical add: unchanged");
            return Ok(count);
        }

        let mut next = guard.clone();
        let fresh: Vec<Entry> = fragments
            .into_iter()
            .map(|fragment| {
                let seq = next.next_seq;
                next.next_seq += 1;
                Entry {
                    seq,
                    terms: self.tokenizer.term_counts(&fragment.text).into_iter().collect(),
                    fragment,
                    weights: BTreeMap::new(),
                }
            })
            .collect();
        let removed = next.replace(doc_id, fresh);
        next.recompute();

        self.commit(&next).await?;
        *guard = next;

        debug!(%doc_id, added = count, removed, corpus = guard.entries.len(), "lexical add");
        Ok(count)
    }

    async fn remove(&self, doc_id: &str) -> Result<usize> {
        let mut guard = self.state.write().await;
        if !guard.entries.iter().any(|e| e.fragment.doc_id == doc_id) {
            return Ok(0);
        }

        let mut next = guard.clone();
        let removed = next.replace(doc_id, Vec::new());
        next.recompute();

        self.commit(&next).await?;
        *guard = next;

        debug!(%doc_id, removed, "lexical remove");
        Ok(removed)
    }

    async fn search(&self, query: &QueryVector, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be > 0".into()));
        }
        let QueryVector::Terms(terms) = query else {
            return Err(RagError::ConfigurationMismatch(
                "dense query vector passed to the lexical index".into(),
            ));
        };

        let guard = self.state.read().await;
        let q = weigh(terms.iter().map(|(t, c)| (t, c)), &guard.idf);
        if q.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let scored = guard.entries.iter().map(|e| {
            let score: f32 = q
                .iter()
                .filter_map(|(t, w)| e.weights.get(t).map(|x| x * w))
                .sum();
            (score, e.seq, &e.fragment)
        });
        Ok(rank::top_k(scored, k))
    }

    async fn size(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn stats(&self) -> IndexStats {
        self.state.read().await.stats()
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
        let guard = self.state.read().await;
        self.commit(&guard).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frags(doc: &str, texts: &[&str]) -> Vec<Fragment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Fragment {
                doc_id: doc.into(),
                position: i,
                text: t.to_string(),
                metadata: Default::default(),
            })
            .collect()
    }

    async fn ask(idx: &LexicalIndex, q: &str, k: usize) -> RetrievalResult {
        let v = idx.vectorize(q).await.unwrap();
        idx.search(&v, k).await.unwrap()
    }

    #[test]
    fn tokenizer_drops_stop_words_and_counts() {
        let t = Tokenizer::new().unwrap();
        assert_eq!(
            t.term_counts("How do I use the Token? token_id, TOKEN"),
            vec![
                ("use".to_string(), 1),
                ("token".to_string(), 2),
                ("~toke".to_string(), 3),
                ("token_id".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn inflected_forms_share_a_prefix() {
        let idx = LexicalIndex::new().unwrap();
        idx.add("auth", frags("auth", &["Auth: use Bearer tokens in the Authorization"]))
            .await
            .unwrap();
        idx.add("misc", frags("misc", &["Webhooks are signed with HMAC."])).await.unwrap();

        let hits = ask(&idx, "How do I authenticate?", 2).await;
        assert_eq!(hits.hits()[0].fragment.doc_id, "auth");
        assert!(hits.hits()[0].score > 0.05);
        assert_eq!(hits.hits()[1].score, 0.0);
    }

    #[tokio::test]
    async fn exact_match_ranks_first() {
        let idx = LexicalIndex::new().unwrap();
        idx.add("pets", frags("pets", &["Cats sleep most of the day."])).await.unwrap();
        idx.add("auth", frags("auth", &["Pagination uses cursor parameters.", "Refresh tokens expire after 30 days."]))
            .await
            .unwrap();
        idx.add("misc", frags("misc", &["Webhooks retry on failure."])).await.unwrap();

        let hits = ask(&idx, "Refresh tokens expire after 30 days.", 3).await;
        assert_eq!(hits.hits()[0].fragment.text, "Refresh tokens expire after 30 days.");
        let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn reingest_replaces_and_is_idempotent() {
        let idx = LexicalIndex::new().unwrap();
        idx.add("x", frags("x", &["legacy endpoint v1", "legacy auth"])).await.unwrap();
        idx.add("y", frags("y", &["unrelated billing text"])).await.unwrap();
        let first = ask(&idx, "billing", 5).await;

        idx.add("y", frags("y", &["unrelated billing text"])).await.unwrap();
        assert_eq!(idx.size().await, 3);
        assert_eq!(ask(&idx, "billing", 5).await, first);

        idx.add("x", frags("x", &["modern endpoint v2"])).await.unwrap();
        let hits = ask(&idx, "legacy", 5).await;
        assert!(hits.iter().all(|h| h.score == 0.0 || h.fragment.doc_id != "x"));
        assert!(hits.iter().all(|h| !h.fragment.text.contains("legacy")));
        assert_eq!(
            idx.stats().await,
            IndexStats {
                fragment_count: 2,
                document_count: 2
            }
        );
    }

    #[tokio::test]
    async fn remove_unknown_is_noop_and_k_zero_rejected() {
        let idx = LexicalIndex::new().unwrap();
        assert_eq!(idx.remove("ghost").await.unwrap(), 0);
        let v = idx.vectorize("anything").await.unwrap();
        assert!(matches!(idx.search(&v, 0).await, Err(RagError::InvalidArgument(_))));
        assert!(matches!(
            idx.search(&QueryVector::Dense(vec![1.0]), 3).await,
            Err(RagError::ConfigurationMismatch(_))
        ));
    }

    #[tokio::test]
    async fn equal_scores_keep_ingestion_order() {
        let idx = LexicalIndex::new().unwrap();
        idx.add("b", frags("b", &["shared phrase"])).await.unwrap();
        idx.add("a", frags("a", &["shared phrase"])).await.unwrap();
        let hits = ask(&idx, "shared phrase", 2).await;
        assert_eq!(hits.hits()[0].fragment.doc_id, "b");
        assert_eq!(hits.hits()[1].fragment.doc_id, "a");

        // Identical re-upload of "b" keeps its place.
        idx.add("b", frags("b", &["shared phrase"])).await.unwrap();
        assert_eq!(ask(&idx, "shared phrase", 2).await, hits);
    }

    #[tokio::test]
    async fn snapshot_restores_identical_results() {
        let dir = tempfile::tempdir().unwrap();
        let open = || LexicalIndex::with_snapshot(Snapshot::open(dir.path(), SNAPSHOT_FILE).unwrap());

        let idx = open().unwrap();
        idx.add("d1", frags("d1", &["rate limits apply per token", "tokens rotate daily"])).await.unwrap();
        idx.add("d2", frags("d2", &["webhooks sign payloads"])).await.unwrap();
        idx.remove("d2").await.unwrap();
        let before = ask(&idx, "token rate", 5).await;
        drop(idx);

        let again = open().unwrap();
        assert_eq!(ask(&again, "token rate", 5).await, before);
        assert_eq!(again.size().await, 2);
    }
}
