//! Saved posts fetched page by page from Reddit.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;

use crate::api::types::{Listing, ListingData, Thing};
use crate::api::RedditApi;
use crate::error::{Error, Result};
use crate::media::{posts_from_listing, SavedPost};
use crate::source::PostSource;

/// Consecutive failed requests before pagination gives up.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Paginates `/user/<name>/saved.json` and persists what it fetched.
pub struct RemoteSource {
    api: RedditApi,
    cache_path: Option<PathBuf>,
    delay_min: Duration,
    delay_max: Duration,
    username: Option<String>,
    after: Option<String>,
    pages: usize,
    finished: bool,
    fetched: Vec<Thing>,
}

impl RemoteSource {
    pub fn new(api: RedditApi) -> Self {
        Self {
            api,
            cache_path: None,
            delay_min: Duration::from_millis(1000),
            delay_max: Duration::from_millis(2000),
            username: None,
            after: None,
            pages: 0,
            finished: false,
            fetched: Vec::new(),
        }
    }

    /// Write the fetched listing to `path` once pagination completes.
    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Random delay between page requests.
    pub fn with_page_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay_min = min;
        self.delay_max = max.max(min);
        self
    }

    async fn pause(&self) {
        let delay = if self.delay_max > self.delay_min {
            rand::thread_rng().gen_range(self.delay_min..=self.delay_max)
        } else {
            self.delay_min
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    async fn username(&mut self) -> Result<String> {
        if let Some(name) = &self.username {
            return Ok(name.clone());
        }

        let name = self
            .with_retries("username lookup", || self.api.get_username())
            .await?;
        tracing::info!("Logged in as u/{}", name);
        self.username = Some(name.clone());
        Ok(name)
    }

    async fn fetch_page(&self, username: &str) -> Result<Listing> {
        let what = format!("saved posts page {}", self.pages + 1);
        self.with_retries(&what, || {
            self.api.get_saved_page(username, self.after.as_deref())
        })
        .await
    }

    /// Run `request`, retrying network and authentication failures up to
    /// [`MAX_CONSECUTIVE_FAILURES`] times in a row.
    async fn with_retries<T, F, Fut>(&self, what: &str, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(e @ (Error::Network(_) | Error::Authentication(_))) => {
                    if attempt >= MAX_CONSECUTIVE_FAILURES {
                        tracing::error!("Giving up on {} after {} attempts", what, attempt);
                        return Err(e);
                    }
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        MAX_CONSECUTIVE_FAILURES,
                        e
                    );
                    attempt += 1;
                    self.pause().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn finish(&mut self) -> Result<()> {
        self.finished = true;
        tracing::info!("Fetched {} saved items in {} pages", self.fetched.len(), self.pages);

        if let Some(path) = &self.cache_path {
            persist_listing(path, std::mem::take(&mut self.fetched)).await?;
            tracing::info!("Saved listing to {}", path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl PostSource for RemoteSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<SavedPost>>> {
        if self.finished {
            return Ok(None);
        }

        let username = self.username().await?;

        if self.pages > 0 {
            self.pause().await;
        }

        let listing = self.fetch_page(&username).await?;
        self.pages += 1;

        let children = listing.data.children;
        if children.is_empty() {
            self.finish().await?;
            return Ok(None);
        }

        tracing::debug!("Page {}: {} items", self.pages, children.len());
        let page = Listing {
            kind: listing.kind,
            data: ListingData {
                after: None,
                children,
            },
        };
        let posts = posts_from_listing(&page)?;
        self.fetched.extend(page.data.children);

        self.after = listing.data.after;
        if self.after.is_none() {
            self.finish().await?;
        }

        Ok(Some(posts))
    }
}

/// Write things as a listing file readable by the file source.
async fn persist_listing(path: &Path, children: Vec<Thing>) -> Result<()> {
    let listing = Listing {
        kind: "Listing".into(),
        data: ListingData {
            after: None,
            children,
        },
    };
    let json = serde_json::to_vec_pretty(&listing)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::filesystem(parent, e))?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|e| Error::filesystem(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fetcher::{FetchError, FetchRequest, FetchResult, Fetcher};
    use crate::api::SessionCookies;
    use crate::source::{collect_all, FileSource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const BASE: &str = "https://reddit.test";

    /// Serves canned responses per URL; a queue lets a URL fail before succeeding.
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: Mutex<HashMap<String, Vec<FetchResult<Vec<u8>>>>>,
        requests: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn respond(&self, path: &str, response: FetchResult<Vec<u8>>) {
            self.responses
                .lock()
                .unwrap()
                .entry(format!("{}{}", BASE, path))
                .or_default()
                .push(response);
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &FetchRequest) -> FetchResult<Vec<u8>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(&request.url) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue[0].clone(),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    fn page(ids: &[&str], after: Option<&str>) -> Vec<u8> {
        let children: Vec<_> = ids
            .iter()
            .map(|id| {
                serde_json::json!({"kind": "t3", "data": {
                    "id": id, "title": id, "url": format!("https://i.redd.it/{}.jpg", id)
                }})
            })
            .collect();
        serde_json::to_vec(&serde_json::json!({
            "kind": "Listing",
            "data": {"after": after, "children": children}
        }))
        .unwrap()
    }

    fn saved_path(after: Option<&str>) -> String {
        let mut path = "/user/alice/saved.json?limit=100&raw_json=1".to_string();
        if let Some(after) = after {
            path.push_str("&after=");
            path.push_str(after);
        }
        path
    }

    fn source(fetcher: Arc<ScriptedFetcher>) -> RemoteSource {
        let api = RedditApi::with_base_url(
            fetcher,
            SessionCookies::new("session-cookie-value".into(), None),
            BASE,
        );
        RemoteSource::new(api).with_page_delay(Duration::ZERO, Duration::ZERO)
    }

    fn logged_in() -> Arc<ScriptedFetcher> {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.respond("/api/me.json", Ok(br#"{"data":{"name":"alice"}}"#.to_vec()));
        fetcher
    }

    #[tokio::test]
    async fn test_paginates_until_empty_batch() {
        let fetcher = logged_in();
        fetcher.respond(&saved_path(None), Ok(page(&["a", "b"], Some("t3_b"))));
        fetcher.respond(&saved_path(Some("t3_b")), Ok(page(&["c"], Some("t3_c"))));
        fetcher.respond(&saved_path(Some("t3_c")), Ok(page(&["d", "e"], Some("t3_e"))));
        fetcher.respond(&saved_path(Some("t3_e")), Ok(page(&[], None)));

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("saved.json");
        let mut remote = source(fetcher.clone()).with_cache(&cache);

        let posts = collect_all(&mut remote).await.unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d", "e"]);

        // me.json plus four pages, nothing after exhaustion
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 5);
        assert!(remote.next_batch().await.unwrap().is_none());
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 5);

        // The cache reads back through the file source
        let mut cached = FileSource::open(&cache).await.unwrap();
        assert_eq!(collect_all(&mut cached).await.unwrap(), posts);
    }

    #[tokio::test]
    async fn test_stops_without_cursor() {
        let fetcher = logged_in();
        fetcher.respond(&saved_path(None), Ok(page(&["a"], None)));

        let posts = collect_all(&mut source(fetcher.clone())).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transient_page_failure_is_retried() {
        let fetcher = logged_in();
        fetcher.respond(&saved_path(None), Err(FetchError::Status(502)));
        fetcher.respond(&saved_path(None), Ok(page(&["a"], None)));

        let posts = collect_all(&mut source(fetcher)).await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_username_failure_is_retried() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.respond("/api/me.json", Err(FetchError::Timeout));
        fetcher.respond("/api/me.json", Ok(br#"{"data":{"name":"alice"}}"#.to_vec()));
        fetcher.respond(&saved_path(None), Ok(page(&["a"], None)));

        let posts = collect_all(&mut source(fetcher.clone())).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_consecutive_failures() {
        let fetcher = logged_in();
        fetcher.respond(&saved_path(None), Err(FetchError::Status(403)));

        let err = collect_all(&mut source(fetcher.clone())).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert_eq!(
            fetcher.requests.load(Ordering::SeqCst),
            1 + MAX_CONSECUTIVE_FAILURES as usize
        );
    }

    #[tokio::test]
    async fn test_network_failure_after_budget() {
        let fetcher = logged_in();
        fetcher.respond(&saved_path(None), Err(FetchError::Timeout));

        let err = collect_all(&mut source(fetcher)).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_logged_out_session() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.respond("/api/me.json", Ok(b"{}".to_vec()));

        let err = collect_all(&mut source(fetcher)).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }
}
