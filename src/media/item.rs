//! Saved post and resolved media representation.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::api::types::RedditVideo;

/// What a saved post links to, judged from its URL and Reddit metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Image,
    Gif,
    Video,
    /// Media on an external gif host (RedGifs).
    External,
    /// Reddit gallery of several images.
    Gallery,
    Unknown,
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKind::Image => write!(f, "image"),
            PostKind::Gif => write!(f, "gif"),
            PostKind::Video => write!(f, "video"),
            PostKind::External => write!(f, "external"),
            PostKind::Gallery => write!(f, "gallery"),
            PostKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A saved Reddit post.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPost {
    /// Reddit base36 ID (without the `t3_` prefix).
    pub id: String,

    pub kind: PostKind,

    /// Link target of the post.
    pub source_url: String,

    pub title: String,

    pub created_at: DateTime<Utc>,

    /// Reddit-hosted video descriptor, if any.
    pub video: Option<RedditVideo>,

    /// MP4 rendition Reddit generated for gif-like links.
    pub preview_video_url: Option<String>,

    /// Gallery images in display order.
    pub gallery: Vec<GalleryImage>,
}

/// One image (or animation) of a gallery post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub url: String,
    pub extension: String,
}

/// A downloadable asset resolved from a saved post.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    pub post_id: String,

    /// Position of this asset within its post (0-based).
    pub index: usize,

    /// Direct file URL, or an HLS playlist for Reddit videos.
    pub direct_url: String,

    /// Separate audio stream to mux into the video.
    pub audio_url: Option<String>,

    /// File extension (without dot).
    pub file_extension: String,

    pub title: String,

    pub created_at: DateTime<Utc>,
}

impl ResolvedMedia {
    /// Single asset for `post` at `url`.
    pub fn for_post(post: &SavedPost, url: String, file_extension: String) -> Self {
        Self {
            post_id: post.id.clone(),
            index: 0,
            direct_url: url,
            audio_url: None,
            file_extension,
            title: post.title.clone(),
            created_at: post.created_at,
        }
    }

    /// Key under which this asset is recorded in the dedup ledger.
    ///
    /// The first asset of a post is keyed by the post ID itself.
    pub fn ledger_key(&self) -> String {
        format!("{}{}", self.post_id, self.index_suffix())
    }

    /// `_2`, `_3`, ... for the second and later assets of a post.
    pub fn index_suffix(&self) -> String {
        if self.index == 0 {
            String::new()
        } else {
            format!("_{}", self.index + 1)
        }
    }

    /// Check if the asset is an HLS stream.
    pub fn is_m3u8(&self) -> bool {
        is_m3u8_url(&self.direct_url)
    }
}

/// Whether a URL points at an HLS playlist.
pub fn is_m3u8_url(url: &str) -> bool {
    url.split('?')
        .next()
        .map(|path| path.ends_with(".m3u8"))
        .unwrap_or(false)
}
