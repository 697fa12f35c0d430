//! JSONL snapshot files for the in-process indexes.
//!
//! One row per fragment. Writes go to a temp file in the same directory and
//! are renamed over the target, so readers only ever see a complete snapshot.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{RagError, Result};
use crate::record::Fragment;

/// Persisted fragment row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Ingestion sequence; restores tie-breaking order after restart.
    pub seq: u64,
    #[serde(flatten)]
    pub fragment: Fragment,
    /// Dense vectors only; the lexical index recomputes its weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Snapshot file location.
#[derive(Clone, Debug)]
pub struct Snapshot {
    dir: PathBuf,
    path: PathBuf,
}

impl Snapshot {
    /// Creates `dir` if needed; the file is `{dir}/{file_name}`.
    pub fn open(dir: impl AsRef<Path>, file_name: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all rows. A missing file is an empty snapshot.
    ///
    /// # Errors
    /// - [`RagError::Io`] on read failures.
    /// - [`RagError::Parse`] with the line number on malformed rows.
    pub fn load(&self) -> Result<Vec<SnapshotRow>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no snapshot yet");
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);

        let mut out = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: SnapshotRow = serde_json::from_str(&line)
                .map_err(|e| RagError::Parse(format!("line {} parse error: {}", i + 1, e)))?;
            out.push(row);
        }

        info!(path = ?self.path, rows = out.len(), "snapshot loaded");
        Ok(out)
    }

    /// Atomically replaces the snapshot with `rows`.
    pub async fn write(&self, rows: Vec<SnapshotRow>) -> Result<()> {
        let dir = self.dir.clone();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &rows))
            .await
            .map_err(|e| RagError::Persist(format!("snapshot task failed: {e}")))?
    }

    /// Checks that the snapshot directory is still usable.
    pub fn ping(&self) -> Result<()> {
        let meta = std::fs::metadata(&self.dir)?;
        if !meta.is_dir() {
            return Err(RagError::Persist(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

fn write_atomic(dir: &Path, path: &Path, rows: &[SnapshotRow]) -> Result<()> {
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        for row in rows {
            serde_json::to_writer(&mut w, row)
                .map_err(|e| RagError::Persist(format!("serialize row: {e}")))?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| RagError::Persist(format!("rename {}: {}", path.display(), e.error)))?;
    debug!(path = ?path, rows = rows.len(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(seq: u64, vector: Option<Vec<f32>>) -> SnapshotRow {
        let mut metadata = crate::record::Metadata::new();
        metadata.insert("chunk_index".into(), serde_json::json!(seq));
        SnapshotRow {
            seq,
            fragment: Fragment {
                doc_id: "d1".into(),
                position: seq as usize,
                text: format!("fragment {seq}"),
                metadata,
            },
            vector,
        }
    }

    #[tokio::test]
    async fn write_then_load_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let snap = Snapshot::open(dir.path(), "dense_fragments.jsonl").unwrap();
        assert!(snap.load().unwrap().is_empty());

        snap.write(vec![row(0, None), row(1, None)]).await.unwrap();
        snap.write(vec![row(7, Some(vec![0.5, 0.25]))]).await.unwrap();

        let rows = snap.load().unwrap();
        assert_eq!(rows, vec![row(7, Some(vec![0.5, 0.25]))]);
    }

    #[test]
    fn malformed_row_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let snap = Snapshot::open(dir.path(), "lexical_fragments.jsonl").unwrap();
        std::fs::write(snap.path(), "\n{not json}\n").unwrap();
        let err = snap.load().unwrap_err();
        assert!(matches!(err, RagError::Parse(ref m) if m.contains("line 2")));
    }

    #[test]
    fn ping_fails_when_directory_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("store");
        let snap = Snapshot::open(&sub, "x.jsonl").unwrap();
        assert!(snap.ping().is_ok());
        std::fs::remove_dir_all(&sub).unwrap();
        assert!(snap.ping().is_err());
    }
}
