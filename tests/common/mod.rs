//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use reddit_saved_downloader::api::{FetchError, FetchRequest, FetchResult, Fetcher};
use reddit_saved_downloader::config::{FilenameStyle, LEDGER_FILE_NAME};
use reddit_saved_downloader::dedup::DedupLedger;
use reddit_saved_downloader::download::{
    shutdown_channel, DownloadPool, Pipeline, RetryPolicy, RunOutcome, Shutdown,
};
use reddit_saved_downloader::fs::ensure_output_dir;
use reddit_saved_downloader::media::MediaResolver;
use reddit_saved_downloader::source::FileSource;

#[derive(Default)]
struct Route {
    body: Vec<u8>,
    failures: VecDeque<FetchError>,
    delay: Duration,
    hang: bool,
}

/// In-memory [`Fetcher`] that records calls and peak concurrency.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    pub fn serve(&self, url: &str, body: &[u8]) {
        self.route(
            url,
            Route {
                body: body.to_vec(),
                ..Default::default()
            },
        );
    }

    pub fn serve_slow(&self, url: &str, body: &[u8], delay: Duration) {
        self.route(
            url,
            Route {
                body: body.to_vec(),
                delay,
                ..Default::default()
            },
        );
    }

    /// Fail with each of `failures` in turn, then serve `body`.
    pub fn fail_then_serve(&self, url: &str, failures: Vec<FetchError>, body: &[u8]) {
        self.route(
            url,
            Route {
                body: body.to_vec(),
                failures: failures.into(),
                ..Default::default()
            },
        );
    }

    /// Never answer.
    pub fn hang(&self, url: &str) {
        self.route(
            url,
            Route {
                hang: true,
                ..Default::default()
            },
        );
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<Vec<u8>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let (delay, hang, outcome) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&request.url) {
                Some(route) => {
                    let outcome = match route.failures.pop_front() {
                        Some(err) => Err(err),
                        None => Ok(route.body.clone()),
                    };
                    (route.delay, route.hang, outcome)
                }
                None => (Duration::ZERO, false, Err(FetchError::Status(404))),
            }
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

/// A `t3` gallery post with one image per URL.
pub fn gallery(id: &str, title: &str, urls: &[&str]) -> serde_json::Value {
    let ids: Vec<String> = (0..urls.len()).map(|i| format!("{}m{}", id, i)).collect();
    let items: Vec<_> = ids
        .iter()
        .map(|media_id| serde_json::json!({ "media_id": media_id }))
        .collect();
    let metadata: serde_json::Map<String, serde_json::Value> = ids
        .iter()
        .zip(urls)
        .map(|(media_id, url)| {
            let entry = serde_json::json!({
                "status": "valid", "e": "Image", "m": "image/jpg", "s": { "u": url }
            });
            (media_id.clone(), entry)
        })
        .collect();

    serde_json::json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": title,
            "url": format!("https://www.reddit.com/gallery/{}", id),
            "created_utc": 1700000000.0,
            "is_gallery": true,
            "gallery_data": { "items": items },
            "media_metadata": metadata
        }
    })
}

/// A `t3` listing child linking to `url`.
pub fn post(id: &str, title: &str, url: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": "t3",
        "data": {"id": id, "title": title, "url": url, "created_utc": 1700000000.0}
    })
}

/// Write a listing file with `children` and return its path.
pub fn write_listing(dir: &Path, children: Vec<serde_json::Value>) -> PathBuf {
    let path = dir.join("saved.json");
    let listing = serde_json::json!({
        "kind": "Listing",
        "data": {"after": null, "children": children}
    });
    std::fs::write(&path, serde_json::to_vec(&listing).unwrap()).unwrap();
    path
}

/// Files in `dir`, excluding the ledger and the input listing.
pub fn media_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != LEDGER_FILE_NAME && name != "saved.json")
        .collect();
    names.sort();
    names
}

pub struct Run {
    pub style: FilenameStyle,
    pub concurrent: usize,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            style: FilenameStyle::Basic,
            concurrent: 5,
        }
    }
}

impl Run {
    /// Run the whole pipeline over `listing` into `output`.
    pub async fn execute(
        &self,
        fetcher: Arc<FakeFetcher>,
        listing: &Path,
        output: &Path,
    ) -> RunOutcome {
        let (_trigger, shutdown) = shutdown_channel();
        self.execute_with_shutdown(fetcher, listing, output, shutdown)
            .await
    }

    pub async fn execute_with_shutdown(
        &self,
        fetcher: Arc<FakeFetcher>,
        listing: &Path,
        output: &Path,
        shutdown: Shutdown,
    ) -> RunOutcome {
        ensure_output_dir(output).await.unwrap();
        let fetcher: Arc<dyn Fetcher> = fetcher;
        let ledger = Arc::new(
            DedupLedger::open(&output.join(LEDGER_FILE_NAME))
                .await
                .unwrap(),
        );
        let retry = RetryPolicy::default().base_delay(Duration::from_millis(1));
        let resolver = MediaResolver::new(fetcher.clone()).with_retry(retry);
        let pool = DownloadPool::new(fetcher, ledger.clone(), output, self.style, self.concurrent)
            .with_retry(retry);

        let mut source = FileSource::open(listing).await.unwrap();
        let pipeline = Pipeline {
            resolver: &resolver,
            ledger: &ledger,
            pool: &pool,
            channel_capacity: self.concurrent * 2,
        };
        pipeline.run(&mut source, shutdown, || {}, |_| {}).await
    }
}
