//! Resolve saved posts to downloadable media.

use std::sync::Arc;

use regex::Regex;

use crate::api::fetcher::{FetchRequest, Fetcher};
use crate::api::redgifs::RedGifsClient;
use crate::download::m3u8::resolve_url;
use crate::download::retry::{run_with_retry, RetryPolicy};
use crate::error::{Error, Result};
use crate::media::item::{PostKind, ResolvedMedia, SavedPost};
use crate::media::parser::{extract_extension_from_url, host_of};

/// Extensions that are safe to download as-is for gif-like posts.
const DIRECT_VIDEO_EXTENSIONS: &[&str] = &["gif", "mp4", "webm"];

/// Maps a [`SavedPost`] to zero or more [`ResolvedMedia`].
pub struct MediaResolver {
    fetcher: Arc<dyn Fetcher>,
    redgifs: RedGifsClient,
    redgifs_id: Regex,
    retry: RetryPolicy,
}

impl MediaResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let redgifs = RedGifsClient::new(fetcher.clone());
        Self::with_redgifs(fetcher, redgifs)
    }

    pub fn with_redgifs(fetcher: Arc<dyn Fetcher>, redgifs: RedGifsClient) -> Self {
        Self {
            fetcher,
            redgifs,
            redgifs_id: Regex::new(r"(?i)redgifs\.com/(?:watch/|ifr/|i/)?([a-z0-9]+)").unwrap(),
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy for manifest and RedGifs requests.
    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        Self {
            redgifs: self.redgifs.with_retry(retry),
            retry,
            ..self
        }
    }

    /// Resolve a post to its downloadable assets.
    ///
    /// Text posts and links to unsupported sites resolve to nothing.
    pub async fn resolve(&self, post: &SavedPost) -> Result<Vec<ResolvedMedia>> {
        match post.kind {
            PostKind::Image => Ok(vec![resolve_image(post)]),
            PostKind::Gif => Ok(resolve_gif(post).into_iter().collect()),
            PostKind::Video => self.resolve_reddit_video(post).await.map(|m| vec![m]),
            PostKind::External => self.resolve_redgifs(post).await.map(|m| vec![m]),
            PostKind::Gallery => Ok(resolve_gallery(post)),
            PostKind::Unknown => Ok(Vec::new()),
        }
    }

    async fn resolve_redgifs(&self, post: &SavedPost) -> Result<ResolvedMedia> {
        let gif_id = self
            .redgifs_id
            .captures(&post.source_url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                Error::UnsupportedMedia(format!("no RedGifs id in {}", post.source_url))
            })?;

        tracing::debug!("Resolving RedGifs {} for post {}", gif_id, post.id);
        let url = self.redgifs.direct_url(&gif_id).await?;
        let extension = extract_extension_from_url(&url).unwrap_or_else(|| "mp4".to_string());

        Ok(ResolvedMedia::for_post(post, url, extension))
    }

    /// Pick the best video stream and its audio rendition from the HLS manifest.
    async fn resolve_reddit_video(&self, post: &SavedPost) -> Result<ResolvedMedia> {
        let video = match &post.video {
            Some(video) => video,
            None => {
                return match &post.preview_video_url {
                    Some(url) => Ok(ResolvedMedia::for_post(post, url.clone(), "mp4".into())),
                    None => Err(Error::UnsupportedMedia(format!(
                        "post {} has no Reddit video stream",
                        post.id
                    ))),
                }
            }
        };

        if let Some(hls_url) = &video.hls_url {
            match self.streams_from_manifest(hls_url).await {
                Ok((video_url, audio_url)) => {
                    let mut media = ResolvedMedia::for_post(post, video_url, "mp4".into());
                    if video.has_audio != Some(false) {
                        media.audio_url = audio_url;
                    }
                    return Ok(media);
                }
                Err(e) if video.fallback_url.is_some() => {
                    tracing::warn!("Manifest for post {} unusable ({}), using fallback", post.id, e);
                }
                Err(e) => return Err(e),
            }
        }

        match &video.fallback_url {
            Some(url) => {
                tracing::warn!("Post {}: downloading video without audio", post.id);
                Ok(ResolvedMedia::for_post(post, url.clone(), "mp4".into()))
            }
            None => Err(Error::UnsupportedMedia(format!(
                "post {} has no combinable video stream",
                post.id
            ))),
        }
    }

    /// Returns `(video playlist, audio playlist)` URLs.
    async fn streams_from_manifest(&self, hls_url: &str) -> Result<(String, Option<String>)> {
        let request = FetchRequest::get(hls_url);
        let body = run_with_retry(&self.retry, || self.fetcher.fetch(&request)).await?;

        let playlist = m3u8_rs::parse_playlist_res(&body)
            .map_err(|e| Error::M3U8(format!("Failed to parse manifest: {:?}", e)))?;

        let master = match playlist {
            m3u8_rs::Playlist::MasterPlaylist(master) => master,
            // Already a media playlist: video only
            m3u8_rs::Playlist::MediaPlaylist(_) => return Ok((hls_url.to_string(), None)),
        };

        // Select highest quality variant
        let variant = master
            .variants
            .iter()
            .filter(|v| !v.is_i_frame)
            .max_by_key(|v| v.bandwidth)
            .ok_or_else(|| Error::UnsupportedMedia("no video variants in manifest".into()))?;

        let video_url = resolve_url(hls_url, &variant.uri)?;

        let audio_url = variant
            .audio
            .as_ref()
            .and_then(|group| {
                let candidates: Vec<_> = master
                    .alternatives
                    .iter()
                    .filter(|alt| {
                        alt.media_type == m3u8_rs::AlternativeMediaType::Audio
                            && &alt.group_id == group
                            && alt.uri.is_some()
                    })
                    .collect();
                candidates
                    .iter()
                    .find(|alt| alt.default)
                    .or(candidates.first())
                    .and_then(|alt| alt.uri.clone())
            })
            .map(|uri| resolve_url(hls_url, &uri))
            .transpose()?;

        Ok((video_url, audio_url))
    }
}

fn resolve_image(post: &SavedPost) -> ResolvedMedia {
    let extension = extract_extension_from_url(&post.source_url).unwrap_or_else(|| "jpg".into());
    ResolvedMedia::for_post(post, post.source_url.clone(), extension)
}

/// One asset per gallery image, numbered in display order.
fn resolve_gallery(post: &SavedPost) -> Vec<ResolvedMedia> {
    post.gallery
        .iter()
        .enumerate()
        .map(|(index, image)| ResolvedMedia {
            index,
            ..ResolvedMedia::for_post(post, image.url.clone(), image.extension.clone())
        })
        .collect()
}

fn resolve_gif(post: &SavedPost) -> Option<ResolvedMedia> {
    let extension = extract_extension_from_url(&post.source_url);

    match extension.as_deref() {
        // Imgur serves an HTML page for .gifv; the .mp4 next to it is the clip
        Some("gifv") if host_of(&post.source_url).as_deref() == Some("i.imgur.com") => {
            let url = post.source_url.replacen(".gifv", ".mp4", 1);
            Some(ResolvedMedia::for_post(post, url, "mp4".into()))
        }
        Some(ext) if DIRECT_VIDEO_EXTENSIONS.contains(&ext) => Some(ResolvedMedia::for_post(
            post,
            post.source_url.clone(),
            ext.to_string(),
        )),
        _ => post
            .preview_video_url
            .as_ref()
            .map(|url| ResolvedMedia::for_post(post, url.clone(), "mp4".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fetcher::{FetchError, FetchResult};
    use crate::api::types::RedditVideo;
    use crate::media::GalleryImage;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    struct MapFetcher(HashMap<String, FetchResult<Vec<u8>>>);

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, request: &FetchRequest) -> FetchResult<Vec<u8>> {
            self.0
                .get(&request.url)
                .cloned()
                .unwrap_or(Err(FetchError::Status(404)))
        }
    }

    fn resolver(responses: Vec<(&str, FetchResult<Vec<u8>>)>) -> MediaResolver {
        let map = responses
            .into_iter()
            .map(|(url, body)| (url.to_string(), body))
            .collect();
        let fetcher: Arc<dyn Fetcher> = Arc::new(MapFetcher(map));
        let redgifs = RedGifsClient::with_base_url(fetcher.clone(), "https://rg.test");
        MediaResolver::with_redgifs(fetcher, redgifs)
    }

    fn post(kind: PostKind, url: &str) -> SavedPost {
        SavedPost {
            id: "p1".into(),
            kind,
            source_url: url.into(),
            title: "Title".into(),
            created_at: Utc::now(),
            video: None,
            preview_video_url: None,
            gallery: Vec::new(),
        }
    }

    /// Answers 503 to the first request for each URL in `flaky`.
    struct FlakyFetcher {
        inner: MapFetcher,
        flaky: Mutex<HashSet<String>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl FlakyFetcher {
        fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, request: &FetchRequest) -> FetchResult<Vec<u8>> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(request.url.clone())
                .or_default() += 1;
            if self.flaky.lock().unwrap().remove(&request.url) {
                return Err(FetchError::Status(503));
            }
            self.inner.fetch(request).await
        }
    }

    fn flaky_resolver(
        responses: Vec<(&str, FetchResult<Vec<u8>>)>,
        flaky: &[&str],
    ) -> (Arc<FlakyFetcher>, MediaResolver) {
        let fetcher = Arc::new(FlakyFetcher {
            inner: MapFetcher(
                responses
                    .into_iter()
                    .map(|(url, body)| (url.to_string(), body))
                    .collect(),
            ),
            flaky: Mutex::new(flaky.iter().map(|url| url.to_string()).collect()),
            calls: Mutex::new(HashMap::new()),
        });
        let shared: Arc<dyn Fetcher> = fetcher.clone();
        let redgifs = RedGifsClient::with_base_url(shared.clone(), "https://rg.test");
        let resolver = MediaResolver::with_redgifs(shared, redgifs)
            .with_retry(RetryPolicy::default().base_delay(Duration::from_millis(1)));
        (fetcher, resolver)
    }

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-VERSION:6\n\
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"audio\",DEFAULT=YES,URI=\"HLS_AUDIO_128.m3u8\"\n\
#EXT-X-STREAM-INF:BANDWIDTH=500000,RESOLUTION=640x360,AUDIO=\"aud\"\n\
HLS_360.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,AUDIO=\"aud\"\n\
HLS_720.m3u8\n";

    #[tokio::test]
    async fn test_image_passthrough() {
        let media = resolver(vec![])
            .resolve(&post(PostKind::Image, "https://i.redd.it/cat.png"))
            .await
            .unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].direct_url, "https://i.redd.it/cat.png");
        assert_eq!(media[0].file_extension, "png");
    }

    #[tokio::test]
    async fn test_gifv_rewritten_to_mp4() {
        let media = resolver(vec![])
            .resolve(&post(PostKind::Gif, "https://i.imgur.com/abc.gifv"))
            .await
            .unwrap();
        assert_eq!(media[0].direct_url, "https://i.imgur.com/abc.mp4");
        assert_eq!(media[0].file_extension, "mp4");
    }

    #[tokio::test]
    async fn test_unknown_resolves_to_nothing() {
        let media = resolver(vec![])
            .resolve(&post(PostKind::Unknown, "https://example.com/article"))
            .await
            .unwrap();
        assert!(media.is_empty());
    }

    #[tokio::test]
    async fn test_reddit_video_from_manifest() {
        let mut p = post(PostKind::Video, "https://v.redd.it/xyz");
        p.video = Some(RedditVideo {
            hls_url: Some("https://v.redd.it/xyz/HLSPlaylist.m3u8?a=1".into()),
            fallback_url: Some("https://v.redd.it/xyz/DASH_720.mp4".into()),
            has_audio: Some(true),
            ..Default::default()
        });

        let media = resolver(vec![(
            "https://v.redd.it/xyz/HLSPlaylist.m3u8?a=1",
            Ok(MASTER.as_bytes().to_vec()),
        )])
        .resolve(&p)
        .await
        .unwrap();

        assert_eq!(media.len(), 1);
        assert_eq!(media[0].direct_url, "https://v.redd.it/xyz/HLS_720.m3u8");
        assert_eq!(
            media[0].audio_url.as_deref(),
            Some("https://v.redd.it/xyz/HLS_AUDIO_128.m3u8")
        );
        assert_eq!(media[0].file_extension, "mp4");
    }

    #[tokio::test]
    async fn test_reddit_video_without_streams_is_unsupported() {
        let mut p = post(PostKind::Video, "https://v.redd.it/xyz");
        p.video = Some(RedditVideo::default());

        let err = resolver(vec![]).resolve(&p).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedMedia(_)));
    }

    #[tokio::test]
    async fn test_reddit_video_falls_back_when_manifest_missing() {
        let mut p = post(PostKind::Video, "https://v.redd.it/xyz");
        p.video = Some(RedditVideo {
            hls_url: Some("https://v.redd.it/xyz/HLSPlaylist.m3u8".into()),
            fallback_url: Some("https://v.redd.it/xyz/DASH_480.mp4".into()),
            ..Default::default()
        });

        let media = resolver(vec![]).resolve(&p).await.unwrap();
        assert_eq!(media[0].direct_url, "https://v.redd.it/xyz/DASH_480.mp4");
        assert!(media[0].audio_url.is_none());
    }

    #[tokio::test]
    async fn test_redgifs_lookup() {
        let media = resolver(vec![
            ("https://rg.test/v2/auth/temporary", Ok(br#"{"token":"t"}"#.to_vec())),
            (
                "https://rg.test/v2/gifs/happycat",
                Ok(br#"{"gif":{"urls":{"hd":"https://media.redgifs.com/HappyCat.mp4","sd":null}}}"#
                    .to_vec()),
            ),
        ])
        .resolve(&post(PostKind::External, "https://www.redgifs.com/watch/HappyCat"))
        .await
        .unwrap();

        assert_eq!(media[0].direct_url, "https://media.redgifs.com/HappyCat.mp4");
        assert_eq!(media[0].file_extension, "mp4");
    }

    #[tokio::test]
    async fn test_redgifs_deleted_is_content_gone() {
        let err = resolver(vec![
            ("https://rg.test/v2/auth/temporary", Ok(br#"{"token":"t"}"#.to_vec())),
            ("https://rg.test/v2/gifs/gone", Err(FetchError::Status(410))),
        ])
        .resolve(&post(PostKind::External, "https://redgifs.com/watch/gone"))
        .await
        .unwrap_err();

        assert!(matches!(err, Error::ContentGone(_)));
    }

    #[tokio::test]
    async fn test_redgifs_hiccups_are_retried() {
        let token_url = "https://rg.test/v2/auth/temporary";
        let gif_url = "https://rg.test/v2/gifs/happycat";
        let (fetcher, resolver) = flaky_resolver(
            vec![
                (token_url, Ok(br#"{"token":"t"}"#.to_vec())),
                (gif_url, Ok(br#"{"gif":{"urls":{"sd":"https://media.redgifs.com/HappyCat-mobile.mp4"}}}"#.to_vec())),
            ],
            &[token_url, gif_url],
        );

        let media = resolver
            .resolve(&post(PostKind::External, "https://redgifs.com/watch/happycat"))
            .await
            .unwrap();

        assert_eq!(media[0].direct_url, "https://media.redgifs.com/HappyCat-mobile.mp4");
        assert_eq!(fetcher.calls(token_url), 2);
        assert_eq!(fetcher.calls(gif_url), 2);
    }

    #[tokio::test]
    async fn test_manifest_hiccup_is_retried() {
        let hls_url = "https://v.redd.it/xyz/HLSPlaylist.m3u8";
        let mut p = post(PostKind::Video, "https://v.redd.it/xyz");
        p.video = Some(RedditVideo {
            hls_url: Some(hls_url.into()),
            has_audio: Some(false),
            ..Default::default()
        });

        let (fetcher, resolver) =
            flaky_resolver(vec![(hls_url, Ok(MASTER.as_bytes().to_vec()))], &[hls_url]);
        let media = resolver.resolve(&p).await.unwrap();

        assert_eq!(media[0].direct_url, "https://v.redd.it/xyz/HLS_720.m3u8");
        assert!(media[0].audio_url.is_none());
        assert_eq!(fetcher.calls(hls_url), 2);
    }

    #[tokio::test]
    async fn test_gallery_yields_numbered_assets() {
        let mut p = post(PostKind::Gallery, "https://www.reddit.com/gallery/p1");
        p.gallery = vec![
            GalleryImage {
                url: "https://preview.redd.it/a.jpg?s=1".into(),
                extension: "jpg".into(),
            },
            GalleryImage {
                url: "https://preview.redd.it/b.gif?format=mp4".into(),
                extension: "mp4".into(),
            },
        ];

        let media = resolver(vec![]).resolve(&p).await.unwrap();
        let keys: Vec<_> = media.iter().map(|m| m.ledger_key()).collect();
        assert_eq!(keys, ["p1", "p1_2"]);
        assert_eq!(media[1].file_extension, "mp4");
        assert_eq!(media[1].title, "Title");
    }

    #[tokio::test]
    async fn test_empty_gallery_resolves_to_nothing() {
        let media = resolver(vec![])
            .resolve(&post(PostKind::Gallery, "https://www.reddit.com/gallery/p1"))
            .await
            .unwrap();
        assert!(media.is_empty());
    }
}
