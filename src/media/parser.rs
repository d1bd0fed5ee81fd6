//! Listing parsing and URL classification.

use chrono::{DateTime, TimeZone, Utc};

use crate::api::types::{Listing, MediaMetadata, PostData, Thing};
use crate::error::{Error, Result};
use crate::media::item::{GalleryImage, PostKind, SavedPost};

/// Hosts that only serve images.
const IMAGE_HOSTS: &[&str] = &["i.redd.it", "preview.redd.it", "i.imgur.com"];

/// Parse a Reddit listing document.
pub fn parse_listing(bytes: &[u8]) -> Result<Listing> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedInput(format!("not a Reddit listing: {}", e)))
}

/// Convert every child of a listing into a [`SavedPost`].
pub fn posts_from_listing(listing: &Listing) -> Result<Vec<SavedPost>> {
    listing.data.children.iter().map(saved_post_from_thing).collect()
}

/// Convert a listing child into a [`SavedPost`].
pub fn saved_post_from_thing(thing: &Thing) -> Result<SavedPost> {
    let data = &thing.data;
    if data.id.trim().is_empty() {
        return Err(Error::MalformedInput(format!(
            "{} entry without an id",
            thing.kind
        )));
    }

    let source_url = data
        .url_overridden_by_dest
        .clone()
        .or_else(|| data.url.clone())
        .unwrap_or_default();

    let title = data
        .title
        .clone()
        .or_else(|| data.link_title.clone())
        .unwrap_or_default();

    let video = data
        .media
        .as_ref()
        .and_then(|m| m.reddit_video.clone())
        .or_else(|| data.secure_media.as_ref().and_then(|m| m.reddit_video.clone()));

    let preview_video_url = data
        .preview
        .as_ref()
        .and_then(|p| p.reddit_video_preview.as_ref())
        .and_then(|v| v.fallback_url.clone());

    let gallery = gallery_images(data);

    // Saved comments have nothing to download
    let kind = if thing.kind != "t3" {
        PostKind::Unknown
    } else if data.is_gallery || !gallery.is_empty() {
        PostKind::Gallery
    } else {
        classify(
            &source_url,
            data.is_video || video.is_some(),
            preview_video_url.is_some(),
        )
    };

    Ok(SavedPost {
        id: data.id.clone(),
        kind,
        source_url,
        title,
        created_at: created_at_from_epoch(data.created_utc),
        video,
        preview_video_url,
        gallery,
    })
}

/// Gallery images in display order, skipping items Reddit has not processed.
fn gallery_images(data: &PostData) -> Vec<GalleryImage> {
    let (gallery, metadata) = match (&data.gallery_data, &data.media_metadata) {
        (Some(gallery), Some(metadata)) => (gallery, metadata),
        _ => return Vec::new(),
    };

    gallery
        .items
        .iter()
        .filter_map(|item| metadata.get(&item.media_id))
        .filter(|meta| meta.status.as_deref().map_or(true, |s| s == "valid"))
        .filter_map(gallery_image)
        .collect()
}

fn gallery_image(meta: &MediaMetadata) -> Option<GalleryImage> {
    let source = meta.source.as_ref()?;

    // Animated items come with an mp4 next to the gif
    if let Some(mp4) = &source.mp4 {
        return Some(GalleryImage {
            url: unescape_url(mp4),
            extension: "mp4".into(),
        });
    }

    let url = unescape_url(source.url.as_ref().or(source.gif.as_ref())?);
    let extension = meta
        .mime
        .as_deref()
        .and_then(|mime| mime.split('/').nth(1))
        .map(str::to_lowercase)
        .or_else(|| extract_extension_from_url(&url))
        .unwrap_or_else(|| "jpg".into());

    Some(GalleryImage { url, extension })
}

/// Listings fetched without `raw_json=1` HTML-escape their URLs.
fn unescape_url(url: &str) -> String {
    url.replace("&amp;", "&")
}

/// Decide what a link points at from its host and path.
pub fn classify(url: &str, is_video: bool, has_preview_video: bool) -> PostKind {
    let host = host_of(url).unwrap_or_default();

    if host == "redgifs.com" || host.ends_with(".redgifs.com") {
        return PostKind::External;
    }

    if is_video || host == "v.redd.it" {
        return PostKind::Video;
    }

    match extract_extension_from_url(url).as_deref() {
        Some("gif") | Some("gifv") => return PostKind::Gif,
        Some(ext) => {
            let top_level = mime_guess::from_ext(ext)
                .first()
                .map(|m| m.type_().as_str().to_string());
            match top_level.as_deref() {
                Some("image") => return PostKind::Image,
                // Silent looping clips (imgur mp4, direct webm)
                Some("video") => return PostKind::Gif,
                _ => {}
            }
        }
        None => {}
    }

    if has_preview_video {
        return PostKind::Gif;
    }

    if IMAGE_HOSTS.contains(&host.as_str()) {
        return PostKind::Image;
    }

    PostKind::Unknown
}

/// Lowercased host of a URL.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
}

/// Extract extension from URL path.
pub fn extract_extension_from_url(url: &str) -> Option<String> {
    // Remove query string and fragment
    let path = url.split(['?', '#']).next()?;

    // Get the last segment
    let filename = path.rsplit('/').next()?;
    if !filename.contains('.') {
        return None;
    }

    // Get extension
    let ext = filename.rsplit('.').next()?;

    // Validate it looks like an extension (1-10 chars, alphanumeric)
    if !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_lowercase())
    } else {
        None
    }
}

/// Reddit `created_utc` (seconds, float) to a timestamp.
fn created_at_from_epoch(created_utc: Option<f64>) -> DateTime<Utc> {
    created_utc
        .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
        .unwrap_or_default()
}
