//! RedGifs metadata lookups.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::fetcher::{FetchRequest, FetchResult, Fetcher};
use crate::api::types::{RedGifsGifResponse, RedGifsToken};
use crate::download::retry::{run_with_retry, RetryPolicy};
use crate::error::{Error, Result};

/// RedGifs API base URL.
const API_BASE: &str = "https://api.redgifs.com";

/// Resolves RedGifs IDs to direct media URLs using a temporary token.
pub struct RedGifsClient {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    retry: RetryPolicy,
    token: Mutex<Option<String>>,
}

impl RedGifsClient {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_base_url(fetcher, API_BASE)
    }

    pub fn with_base_url(fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            token: Mutex::new(None),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Direct URL of the best rendition for `gif_id`.
    ///
    /// Returns [`Error::ContentGone`] if RedGifs no longer has the item.
    pub async fn direct_url(&self, gif_id: &str) -> Result<String> {
        let token = self.token(false).await?;

        let response = match self.lookup(gif_id, &token).await {
            // Temporary tokens expire; get a fresh one once
            Err(e) if e.is_auth() => {
                let token = self.token(true).await?;
                self.lookup(gif_id, &token).await
            }
            other => other,
        };

        let body = response.map_err(|e| {
            if e.is_gone() {
                Error::ContentGone(format!("redgifs {}", gif_id))
            } else {
                Error::Network(format!("RedGifs lookup for {} failed: {}", gif_id, e))
            }
        })?;

        let parsed: RedGifsGifResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::Network(format!("Failed to parse RedGifs response: {}", e)))?;

        parsed
            .gif
            .urls
            .best()
            .map(str::to_string)
            .ok_or_else(|| Error::UnsupportedMedia(format!("redgifs {} has no renditions", gif_id)))
    }

    async fn lookup(&self, gif_id: &str, token: &str) -> FetchResult<Vec<u8>> {
        let url = format!("{}/v2/gifs/{}", self.base_url, gif_id.to_lowercase());
        let request = FetchRequest::get(url).with_bearer(token);
        run_with_retry(&self.retry, || self.fetcher.fetch(&request)).await
    }

    /// Cached temporary token, fetched on first use or when `refresh` is set.
    async fn token(&self, refresh: bool) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let (Some(token), false) = (guard.as_ref(), refresh) {
            return Ok(token.clone());
        }

        let request = FetchRequest::get(format!("{}/v2/auth/temporary", self.base_url));
        let body = run_with_retry(&self.retry, || self.fetcher.fetch(&request))
            .await
            .map_err(|e| Error::Network(format!("Failed to get RedGifs token: {}", e)))?;

        let token: RedGifsToken = serde_json::from_slice(&body)
            .map_err(|e| Error::Network(format!("Failed to parse RedGifs token: {}", e)))?;

        tracing::debug!("Obtained RedGifs temporary token");
        *guard = Some(token.token.clone());
        Ok(token.token)
    }
}
