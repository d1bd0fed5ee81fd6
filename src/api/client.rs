//! Reddit API client for the saved-posts listing.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::api::auth::SessionCookies;
use crate::api::fetcher::{FetchError, FetchRequest, Fetcher};
use crate::api::types::{Listing, MeResponse};
use crate::error::{Error, Result};

/// Reddit base URL.
const API_BASE: &str = "https://www.reddit.com";

/// Maximum items per listing page.
pub const PAGE_LIMIT: usize = 100;

/// Reddit API client authenticated with browser cookies.
pub struct RedditApi {
    fetcher: Arc<dyn Fetcher>,
    cookies: SessionCookies,
    base_url: String,
}

impl RedditApi {
    pub fn new(fetcher: Arc<dyn Fetcher>, cookies: SessionCookies) -> Self {
        Self::with_base_url(fetcher, cookies, API_BASE)
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(
        fetcher: Arc<dyn Fetcher>,
        cookies: SessionCookies,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            cookies,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Make an authenticated GET request and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let request = FetchRequest::get(url).with_cookies(&self.cookies);

        let body = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| match e {
                e if e.is_auth() => Error::Authentication(e.to_string()),
                FetchError::Status(429) => Error::Network("rate limited (HTTP 429)".into()),
                e => Error::from(e),
            })?;

        // A challenge page instead of JSON is a transient failure, not bad input
        serde_json::from_slice(&body).map_err(|e| {
            let text = String::from_utf8_lossy(&body);
            Error::Network(format!(
                "Unexpected response from Reddit: {} - Response: {}",
                e,
                text.chars().take(200).collect::<String>()
            ))
        })
    }

    /// Name of the logged-in account (validates the cookies).
    pub async fn get_username(&self) -> Result<String> {
        let me: MeResponse = self.get("/api/me.json").await?;
        me.data.map(|d| d.name).ok_or_else(|| {
            Error::Authentication("Reddit did not recognise the session cookie".into())
        })
    }

    /// Fetch one page of the user's saved items.
    pub async fn get_saved_page(&self, username: &str, after: Option<&str>) -> Result<Listing> {
        let mut path = format!(
            "/user/{}/saved.json?limit={}&raw_json=1",
            username, PAGE_LIMIT
        );
        if let Some(after) = after {
            path.push_str("&after=");
            path.push_str(after);
        }

        self.get(&path).await
    }
}
