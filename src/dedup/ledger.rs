//! Persisted ledger of downloaded posts.
//!
//! One key per line, appended and flushed on every record so an interrupted
//! run keeps everything it finished.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

struct LedgerInner {
    seen: HashSet<String>,
    file: File,
}

/// Set of keys already downloaded, shared by all download workers.
///
/// Reads and writes go through a single lock.
pub struct DedupLedger {
    path: PathBuf,
    inner: Mutex<LedgerInner>,
}

impl DedupLedger {
    /// Load the ledger at `path`, creating it if missing.
    pub async fn open(path: &Path) -> Result<Self> {
        let seen = match tokio::fs::read_to_string(path).await {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(Error::filesystem(path, e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| Error::filesystem(path, e))?;

        tracing::debug!("Loaded {} ledger entries from {}", seen.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(LedgerInner { seen, file }),
        })
    }

    /// Check if a key has already been downloaded.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.lock().await.seen.contains(key)
    }

    /// Record a completed download. Recording a known key is a no-op.
    pub async fn record(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.seen.contains(key) {
            return Ok(());
        }

        let line = format!("{}\n", key);
        inner
            .file
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::filesystem(&self.path, e))?;
        inner
            .file
            .flush()
            .await
            .map_err(|e| Error::filesystem(&self.path, e))?;

        inner.seen.insert(key.to_string());
        Ok(())
    }

    /// Number of recorded keys.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.seen.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
