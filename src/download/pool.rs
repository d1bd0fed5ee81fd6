//! Bounded-concurrency download pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::stream::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::api::fetcher::{FetchRequest, FetchResult, Fetcher};
use crate::config::FilenameStyle;
use crate::dedup::DedupLedger;
use crate::download::m3u8::download_m3u8;
use crate::download::record::DownloadRecord;
use crate::download::retry::{run_with_retry, RetryPolicy};
use crate::download::shutdown::Shutdown;
use crate::error::{Error, Result};
use crate::fs::{part_path, Allocation, PathAllocator};
use crate::media::ResolvedMedia;

/// Work handed to the pool.
#[derive(Debug, Clone)]
pub enum PoolItem {
    /// An asset to fetch.
    Download(ResolvedMedia),
    /// An outcome decided before download (skips, resolve failures).
    Settled(DownloadRecord),
}

/// Downloads resolved media with at most `concurrent` items in flight.
pub struct DownloadPool {
    fetcher: Arc<dyn Fetcher>,
    ledger: Arc<DedupLedger>,
    allocator: PathAllocator,
    retry: RetryPolicy,
    concurrent: usize,
    /// Ledger keys currently being downloaded.
    in_flight: Mutex<HashSet<String>>,
}

impl DownloadPool {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        ledger: Arc<DedupLedger>,
        output_dir: impl Into<PathBuf>,
        style: FilenameStyle,
        concurrent: usize,
    ) -> Self {
        Self {
            fetcher,
            ledger,
            allocator: PathAllocator::new(output_dir, style),
            retry: RetryPolicy::default(),
            concurrent: concurrent.max(1),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process `items` until the stream ends or shutdown is triggered,
    /// passing every outcome to `on_record` as it completes.
    ///
    /// Items not yet started when shutdown fires produce no record.
    pub async fn run<S, F>(&self, items: S, shutdown: Shutdown, mut on_record: F)
    where
        S: Stream<Item = PoolItem>,
        F: FnMut(DownloadRecord),
    {
        let records = items
            .take_until(shutdown.clone().wait())
            .map(|item| {
                let shutdown = shutdown.clone();
                async move {
                    match item {
                        PoolItem::Settled(record) => record,
                        PoolItem::Download(media) => self.download(&media, shutdown).await,
                    }
                }
            })
            .buffer_unordered(self.concurrent);
        futures::pin_mut!(records);

        while let Some(record) = records.next().await {
            on_record(record);
        }
    }

    /// Download one asset. Never fails; problems become a failed record.
    pub async fn download(&self, media: &ResolvedMedia, shutdown: Shutdown) -> DownloadRecord {
        let key = media.ledger_key();

        // A post listed twice is downloaded once; the later copy is a duplicate
        let _claim = match InFlightKey::claim(&self.in_flight, &key) {
            Some(claim) => claim,
            None => {
                tracing::debug!("Skipping {}: already being downloaded", key);
                return DownloadRecord::duplicate(key, None);
            }
        };

        if self.ledger.contains(&key).await {
            tracing::debug!("Skipping {}: already in ledger", key);
            return DownloadRecord::duplicate(key, None);
        }

        let path = match self.allocator.allocate(media).await {
            Ok(Allocation::Fresh(path)) => path,
            Ok(Allocation::Existing(path)) => {
                // Downloaded before but never recorded
                tracing::debug!("Skipping {}: {} exists", key, path.display());
                return match self.ledger.record(&key).await {
                    Ok(()) => DownloadRecord::duplicate(key, Some(path)),
                    Err(e) => DownloadRecord::failed(key, e.to_string()),
                };
            }
            Err(e) => return DownloadRecord::failed(key, e.to_string()),
        };

        let part = part_path(&path);
        let result = tokio::select! {
            result = self.fetch_to(media, &part, &path) => result,
            _ = shutdown.wait() => Err(Error::Interrupted),
        };

        match result {
            Ok(()) => match self.ledger.record(&key).await {
                Ok(()) => {
                    tracing::debug!("Downloaded {} to {}", key, path.display());
                    DownloadRecord::success(key, path)
                }
                Err(e) => DownloadRecord::failed(key, e.to_string()),
            },
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                self.allocator.release(&path).await;

                let reason = match e {
                    Error::Interrupted => "interrupted".to_string(),
                    e => e.to_string(),
                };
                tracing::warn!("Failed to download {} ({}): {}", key, media.direct_url, reason);
                DownloadRecord::failed(key, reason)
            }
        }
    }

    /// Write the asset to `part`, then move it onto `path`.
    async fn fetch_to(&self, media: &ResolvedMedia, part: &Path, path: &Path) -> Result<()> {
        if media.is_m3u8() {
            download_m3u8(
                self.fetcher.as_ref(),
                &self.retry,
                &media.direct_url,
                media.audio_url.as_deref(),
                part,
            )
            .await?;
        } else {
            let request = FetchRequest::get(media.direct_url.as_str());
            // Each attempt starts the file over; write errors are not retried
            run_with_retry(&self.retry, || {
                write_body(self.fetcher.as_ref(), &request, part)
            })
            .await??;
        }

        tokio::fs::rename(part, path)
            .await
            .map_err(|e| Error::filesystem(path, e))
    }
}

/// Stream one response body into `path`.
///
/// The outer result is the fetch outcome, the inner one the local write.
async fn write_body(
    fetcher: &dyn Fetcher,
    request: &FetchRequest,
    path: &Path,
) -> FetchResult<Result<()>> {
    let mut body = fetcher.fetch_stream(request).await?;

    let mut file = match File::create(path).await {
        Ok(file) => file,
        Err(e) => return Ok(Err(Error::filesystem(path, e))),
    };

    while let Some(chunk) = body.next().await {
        if let Err(e) = file.write_all(&chunk?).await {
            return Ok(Err(Error::filesystem(path, e)));
        }
    }

    Ok(file.flush().await.map_err(|e| Error::filesystem(path, e)))
}

/// Marks a ledger key as being downloaded until dropped.
struct InFlightKey<'a> {
    keys: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightKey<'a> {
    /// `None` if another download holds `key`.
    fn claim(keys: &'a Mutex<HashSet<String>>, key: &str) -> Option<Self> {
        let mut held = keys.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(key.to_string()) {
            return None;
        }
        Some(Self {
            keys,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightKey<'_> {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}
