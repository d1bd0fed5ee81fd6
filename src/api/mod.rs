//! Network access.
//!
//! This module provides:
//! - The pluggable [`Fetcher`] seam and its reqwest implementation
//! - Reddit session cookies
//! - The Reddit saved-listing client
//! - RedGifs metadata lookups
//! - API response types

pub mod auth;
pub mod client;
pub mod fetcher;
pub mod redgifs;
pub mod types;

pub use auth::SessionCookies;
pub use client::{RedditApi, PAGE_LIMIT};
pub use fetcher::{BodyStream, FetchError, FetchRequest, FetchResult, Fetcher, HttpFetcher};
pub use redgifs::RedGifsClient;
pub use types::*;
