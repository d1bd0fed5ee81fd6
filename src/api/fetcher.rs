//! Pluggable HTTP fetcher.
//!
//! Everything that talks to the network goes through [`Fetcher`], so the
//! source, resolver and download pool can be exercised with fakes and an
//! anti-bot capable fetcher can be swapped in without touching them.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{header, Client, RequestBuilder};

use crate::api::auth::SessionCookies;
use crate::error::{Error, Result};

/// A GET request with optional cookies and bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub cookie_header: Option<String>,
    pub bearer: Option<String>,
}

impl FetchRequest {
    /// Plain GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cookie_header: None,
            bearer: None,
        }
    }

    /// Attach the session cookies.
    pub fn with_cookies(mut self, cookies: &SessionCookies) -> Self {
        self.cookie_header = Some(cookies.header_value());
        self
    }

    /// Attach an `Authorization: Bearer` token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Structured fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// 401/403: credentials rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Status(401) | FetchError::Status(403))
    }

    /// 404/410: the resource no longer exists.
    pub fn is_gone(&self) -> bool {
        matches!(self, FetchError::Status(404) | FetchError::Status(410))
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            FetchError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Other(err.to_string())
        }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::Network(err.to_string())
    }
}

/// Result of a fetch.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Response body delivered chunk by chunk.
pub type BodyStream = BoxStream<'static, FetchResult<Vec<u8>>>;

/// Fetch a URL and return its body or a structured failure.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<Vec<u8>>;

    /// Fetch a URL as a stream of body chunks.
    ///
    /// The default buffers the whole body through [`Fetcher::fetch`].
    async fn fetch_stream(&self, request: &FetchRequest) -> FetchResult<BodyStream> {
        let body = self.fetch(request).await?;
        Ok(stream::once(async move { Ok(body) }).boxed())
    }
}

/// [`Fetcher`] backed by reqwest.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given user agent and per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn build(&self, request: &FetchRequest) -> RequestBuilder {
        let mut builder = self.client.get(&request.url);
        if let Some(cookies) = &request.cookie_header {
            builder = builder.header(header::COOKIE, cookies);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send the request and reject non-success statuses.
    async fn send(&self, request: &FetchRequest) -> FetchResult<reqwest::Response> {
        tracing::debug!("GET {}", request.url);

        let response = self
            .build(request)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<Vec<u8>> {
        let response = self.send(request).await?;
        let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
        Ok(body.to_vec())
    }

    async fn fetch_stream(&self, request: &FetchRequest) -> FetchResult<BodyStream> {
        let response = self.send(request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(FetchError::from_reqwest)
            })
            .boxed())
    }
}
