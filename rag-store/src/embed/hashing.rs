//! Deterministic offline embedder.
//!
//! Feature-hashes lowercased character trigrams of each word (padded with `#`)
//! into a fixed number of buckets with `blake3`, then L2-normalizes. Words that
//! share stems ("auth", "authenticate", "authorization") land close together,
//! which is enough for tests and air-gapped deployments.

use crate::embed::{EmbedFuture, EmbeddingsProvider};
use crate::errors::{RagError, Result};

/// Default bucket count.
pub const DEFAULT_HASHING_DIM: usize = 512;

#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(RagError::InvalidConfiguration(
                "hashing embedder dimension must be > 0".into(),
            ));
        }
        Ok(Self { dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Synchronous embedding; the trait impl wraps this.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();

        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let padded: Vec<char> = std::iter::once('#')
                .chain(word.chars())
                .chain(std::iter::once('#'))
                .collect();
            for tri in padded.windows(3) {
                let s: String = tri.iter().collect();
                v[self.bucket(&s)] += 1.0;
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn bucket(&self, gram: &str) -> usize {
        let hash = blake3::hash(gram.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(head) % self.dim as u64) as usize
    }
}

impl EmbeddingsProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        let v = self.embed_sync(text);
        Box::pin(async move { Ok(v) })
    }
}
