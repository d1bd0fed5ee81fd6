//! Saved-post sources.
//!
//! Provides:
//! - The [`PostSource`] batch capability
//! - A source reading an exported listing file
//! - A source paginating the logged-in account's saved listing

pub mod file;
pub mod remote;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::SavedPost;

pub use file::FileSource;
pub use remote::{RemoteSource, MAX_CONSECUTIVE_FAILURES};

/// A lazy sequence of saved-post batches.
#[async_trait]
pub trait PostSource: Send {
    /// Next batch, or `None` once the source is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<SavedPost>>>;
}

/// Drain a source into one list.
pub async fn collect_all(source: &mut dyn PostSource) -> Result<Vec<SavedPost>> {
    let mut posts = Vec::new();
    while let Some(batch) = source.next_batch().await? {
        posts.extend(batch);
    }
    Ok(posts)
}
