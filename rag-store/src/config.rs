//! Index configuration.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use crate::errors::RagError;

/// Which vector representation an index (and its queries) use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Corpus-relative TF-IDF weights, no external calls.
    Lexical,
    /// Fixed-dimension embeddings from an [`EmbeddingsProvider`](crate::EmbeddingsProvider).
    Dense,
}

impl FromStr for IndexKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "tfidf" => Ok(Self::Lexical),
            "dense" | "embedding" => Ok(Self::Dense),
            other => Err(RagError::InvalidConfiguration(format!(
                "unknown index backend `{other}` (expected lexical|dense)"
            ))),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lexical => "lexical",
            Self::Dense => "dense",
        })
    }
}

/// Configuration for building an index.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub kind: IndexKind,
    /// Dense vector dimension; ignored by the lexical index.
    pub dim: usize,
    /// Maximum in-flight embedding calls per ingest.
    pub embed_concurrency: usize,
    /// Deadline for each embedding call.
    pub embed_timeout: Duration,
    /// Snapshot directory; `None` keeps the index in memory only.
    pub store_dir: Option<PathBuf>,
}

impl IndexConfig {
    /// Sane defaults for a given kind: dim 512, concurrency 4, 30s timeout, no persistence.
    pub fn new_default(kind: IndexKind) -> Self {
        Self {
            kind,
            dim: crate::embed::hashing::DEFAULT_HASHING_DIM,
            embed_concurrency: 4,
            embed_timeout: Duration::from_secs(30),
            store_dir: None,
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.kind == IndexKind::Dense && self.dim == 0 {
            return Err(RagError::InvalidConfiguration(
                "dense index dimension must be > 0".into(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::InvalidConfiguration(
                "embed_concurrency must be > 0".into(),
            ));
        }
        if self.embed_timeout.is_zero() {
            return Err(RagError::InvalidConfiguration(
                "embed_timeout must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("Lexical".parse::<IndexKind>().unwrap(), IndexKind::Lexical);
        assert_eq!("dense".parse::<IndexKind>().unwrap(), IndexKind::Dense);
        assert!("qdrant".parse::<IndexKind>().is_err());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut cfg = IndexConfig::new_default(IndexKind::Dense);
        assert!(cfg.validate().is_ok());
        cfg.dim = 0;
        assert!(cfg.validate().is_err());
        let mut cfg = IndexConfig::new_default(IndexKind::Lexical);
        cfg.embed_concurrency = 0;
        assert!(cfg.validate().is_err());
    }
}
