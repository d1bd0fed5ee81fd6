//! Reddit and RedGifs response type definitions.
//!
//! The listing types are also the on-disk format of the saved-posts file, so
//! they serialize back to the same shape Reddit returns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A Reddit listing (`{"kind": "Listing", "data": {...}}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default = "listing_kind")]
    pub kind: String,
    pub data: ListingData,
}

fn listing_kind() -> String {
    "Listing".to_string()
}

/// Listing payload: a page of things plus the pagination cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub children: Vec<Thing>,
}

/// A listing entry. `t3` is a link post, `t1` a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: PostData,
}

/// Fields of a saved post we care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Comments carry the title of their parent post here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_overridden_by_dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_utc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaEmbed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_media: Option<MediaEmbed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
    #[serde(default)]
    pub is_gallery: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery_data: Option<GalleryData>,
    /// Gallery media keyed by media id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_metadata: Option<HashMap<String, MediaMetadata>>,
}

/// Gallery items in display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryData {
    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryItem {
    pub media_id: String,
}

/// One `media_metadata` entry. Reddit abbreviates the field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// `valid` once Reddit has processed the upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// `Image` or `AnimatedImage`.
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    /// MIME type such as `image/jpg`.
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Full-size rendition.
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MediaSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gif: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4: Option<String>,
}

/// `media` / `secure_media` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaEmbed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_video: Option<RedditVideo>,
}

/// Reddit-hosted video descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedditVideo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hls_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
    #[serde(default)]
    pub is_gif: bool,
}

/// `preview` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_video_preview: Option<RedditVideo>,
}

/// `/api/me.json` response. Empty (`{}`) when the cookies are not logged in.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub data: Option<MeData>,
}

#[derive(Debug, Deserialize)]
pub struct MeData {
    pub name: String,
}

/// RedGifs temporary token response.
#[derive(Debug, Deserialize)]
pub struct RedGifsToken {
    pub token: String,
}

/// RedGifs gif lookup response.
#[derive(Debug, Deserialize)]
pub struct RedGifsGifResponse {
    pub gif: RedGifsGif,
}

#[derive(Debug, Deserialize)]
pub struct RedGifsGif {
    #[serde(default)]
    pub urls: RedGifsUrls,
}

/// Renditions offered for a RedGifs item.
#[derive(Debug, Default, Deserialize)]
pub struct RedGifsUrls {
    pub hd: Option<String>,
    pub sd: Option<String>,
    pub gif: Option<String>,
}

impl RedGifsUrls {
    /// Best available rendition.
    pub fn best(&self) -> Option<&str> {
        self.hd
            .as_deref()
            .or(self.sd.as_deref())
            .or(self.gif.as_deref())
    }
}
