//! Saved posts from an exported listing file.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::media::{parse_listing, posts_from_listing, SavedPost};
use crate::source::PostSource;

/// Yields every post of a listing file as one batch.
///
/// The file is parsed up front so malformed input is reported before any
/// download starts.
pub struct FileSource {
    posts: Option<Vec<SavedPost>>,
}

impl FileSource {
    pub async fn open(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::filesystem(path, e))?;

        let listing = parse_listing(&bytes).map_err(|e| match e {
            Error::MalformedInput(msg) => {
                Error::MalformedInput(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        let posts = posts_from_listing(&listing)?;

        tracing::info!("Loaded {} saved posts from {}", posts.len(), path.display());
        Ok(Self { posts: Some(posts) })
    }
}

#[async_trait]
impl PostSource for FileSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<SavedPost>>> {
        Ok(self.posts.take())
    }
}
