//! Reddit Saved Downloader - download the media behind your saved Reddit posts.
//!
//! # Features
//!
//! - Read saved posts from an exported `saved.json` listing, or fetch them
//!   live with the browser's `reddit_session` cookie
//! - Images, GIFs, Reddit-hosted videos (muxed with their audio) and RedGifs
//! - Bounded-concurrency downloads with retry and backoff
//! - Persistent ledger so reruns skip what is already on disk
//! - Basic, pretty and advanced filename styles
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use reddit_saved_downloader::{
//!     dedup::DedupLedger,
//!     download::{shutdown_channel, DownloadPool, Pipeline},
//!     media::MediaResolver,
//!     source::FileSource,
//!     Config, Fetcher, HttpFetcher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
//!         &config.account.user_agent,
//!         config.request_timeout(),
//!     )?);
//!
//!     let ledger = Arc::new(DedupLedger::open(&config.ledger_path()).await?);
//!     let resolver = MediaResolver::new(fetcher.clone());
//!     let pool = DownloadPool::new(
//!         fetcher,
//!         ledger.clone(),
//!         &config.options.output_directory,
//!         config.options.filename_style,
//!         config.options.concurrent,
//!     );
//!
//!     let mut source = FileSource::open(Path::new("saved.json")).await?;
//!     let (_trigger, shutdown) = shutdown_channel();
//!     let pipeline = Pipeline {
//!         resolver: &resolver,
//!         ledger: &ledger,
//!         pool: &pool,
//!         channel_capacity: 16,
//!     };
//!     let outcome = pipeline.run(&mut source, shutdown, || {}, |_| {}).await;
//!     println!("{} downloaded", outcome.report.success);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod download;
pub mod error;
pub mod fs;
pub mod logging;
pub mod media;
pub mod output;
pub mod source;

// Re-exports for convenience
pub use api::{Fetcher, HttpFetcher, RedditApi};
pub use config::{Config, FilenameStyle, InputMode};
pub use download::{DownloadPool, DownloadRecord, DownloadStatus, Pipeline};
pub use error::{Error, Result};
pub use media::{MediaResolver, ResolvedMedia, SavedPost};
pub use source::{FileSource, PostSource, RemoteSource};
