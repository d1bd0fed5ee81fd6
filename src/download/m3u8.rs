//! M3U8/HLS playlist downloading.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::stream::{self, StreamExt};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::api::fetcher::{FetchRequest, Fetcher};
use crate::download::retry::{run_with_retry, RetryPolicy};
use crate::error::{Error, Result};
use crate::fs::SCRATCH_DIR_PREFIX;

/// Maximum concurrent segment downloads per stream.
const MAX_CONCURRENT_SEGMENTS: usize = 4;

/// Download an HLS video (and optional separate audio) into one MP4 at `output_path`.
///
/// `output_path` may carry any extension; the container is always MP4.
pub async fn download_m3u8(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    video_url: &str,
    audio_url: Option<&str>,
    output_path: &Path,
) -> Result<()> {
    let parent = output_path
        .parent()
        .ok_or_else(|| Error::M3U8("Output path has no parent directory".into()))?;
    let temp_dir = ScratchDir::create(parent).await?;

    download_streams(fetcher, retry, video_url, audio_url, &temp_dir.0, output_path).await
}

/// Segment scratch directory, removed when dropped (including on cancellation).
struct ScratchDir(PathBuf);

impl ScratchDir {
    async fn create(parent: &Path) -> Result<Self> {
        let path = parent.join(format!("{}{}", SCRATCH_DIR_PREFIX, uuid::Uuid::new_v4()));
        fs::create_dir_all(&path)
            .await
            .map_err(|e| Error::filesystem(&path, e))?;
        Ok(Self(path))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

async fn download_streams(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    video_url: &str,
    audio_url: Option<&str>,
    temp_dir: &Path,
    output_path: &Path,
) -> Result<()> {
    let video_path = temp_dir.join("video.ts");
    download_stream(fetcher, retry, video_url, &video_path).await?;

    let audio_path = match audio_url {
        Some(url) => {
            let path = temp_dir.join("audio.ts");
            download_stream(fetcher, retry, url, &path).await?;
            Some(path)
        }
        None => None,
    };

    mux(&video_path, audio_path.as_deref(), output_path).await
}

/// Download every segment of one stream and append them, in order, to `output`.
async fn download_stream(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    playlist_url: &str,
    output: &Path,
) -> Result<()> {
    let segments = fetch_segments(fetcher, retry, playlist_url).await?;
    if segments.is_empty() {
        return Err(Error::M3U8(format!("No segments found in {}", playlist_url)));
    }
    tracing::debug!("Downloading {} segments from {}", segments.len(), playlist_url);

    let mut file = File::create(output)
        .await
        .map_err(|e| Error::filesystem(output, e))?;

    // `buffered` keeps segment order while fetching ahead
    let mut bodies = stream::iter(segments)
        .map(|url| async move { fetch_bytes(fetcher, retry, &url).await })
        .buffered(MAX_CONCURRENT_SEGMENTS);

    while let Some(body) = bodies.next().await {
        file.write_all(&body?)
            .await
            .map_err(|e| Error::filesystem(output, e))?;
    }

    file.flush().await.map_err(|e| Error::filesystem(output, e))?;
    Ok(())
}

/// Fetch a playlist and return its segment URLs, descending into the best
/// variant when given a master playlist.
async fn fetch_segments(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    url: &str,
) -> Result<Vec<String>> {
    let content = fetch_bytes(fetcher, retry, url).await?;
    let playlist = m3u8_rs::parse_playlist_res(&content)
        .map_err(|e| Error::M3U8(format!("Failed to parse playlist: {:?}", e)))?;

    match playlist {
        m3u8_rs::Playlist::MasterPlaylist(master) => {
            // Select highest quality variant
            let variant = master
                .variants
                .iter()
                .filter(|v| !v.is_i_frame)
                .max_by_key(|v| v.bandwidth)
                .ok_or_else(|| Error::M3U8("No variants in master playlist".into()))?;

            let variant_url = resolve_url(url, &variant.uri)?;
            let media_content = fetch_bytes(fetcher, retry, &variant_url).await?;
            let media_playlist = m3u8_rs::parse_playlist_res(&media_content)
                .map_err(|e| Error::M3U8(format!("Failed to parse media playlist: {:?}", e)))?;

            match media_playlist {
                m3u8_rs::Playlist::MediaPlaylist(mp) => extract_segments(&variant_url, &mp),
                _ => Err(Error::M3U8("Expected media playlist".into())),
            }
        }
        m3u8_rs::Playlist::MediaPlaylist(media) => extract_segments(url, &media),
    }
}

/// Extract segment URLs from a media playlist.
///
/// The initialization section comes first. Consecutive byte ranges of one
/// file collapse into a single URL.
fn extract_segments(base_url: &str, playlist: &m3u8_rs::MediaPlaylist) -> Result<Vec<String>> {
    let mut urls: Vec<String> = Vec::with_capacity(playlist.segments.len() + 1);

    for segment in &playlist.segments {
        if let Some(map) = &segment.map {
            let init = resolve_url(base_url, &map.uri)?;
            if !urls.contains(&init) {
                urls.push(init);
            }
        }

        let url = resolve_url(base_url, &segment.uri)?;
        if urls.last() != Some(&url) {
            urls.push(url);
        }
    }

    Ok(urls)
}

async fn fetch_bytes(fetcher: &dyn Fetcher, retry: &RetryPolicy, url: &str) -> Result<Vec<u8>> {
    let request = FetchRequest::get(url);
    run_with_retry(retry, || fetcher.fetch(&request))
        .await
        .map_err(|e| Error::Network(format!("{} ({})", e, url)))
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &str, path: &str) -> Result<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let base_url = url::Url::parse(base)?;
    let resolved = base_url.join(path)?;
    Ok(resolved.to_string())
}

/// Remux the downloaded streams into an MP4 container using ffmpeg.
async fn mux(video: &Path, audio: Option<&Path>, output: &Path) -> Result<()> {
    let mut inputs: Vec<PathBuf> = vec![video.to_path_buf()];
    inputs.extend(audio.map(Path::to_path_buf));

    let mut args: Vec<String> = vec!["-y".into()];
    for input in &inputs {
        let input = input
            .to_str()
            .ok_or_else(|| Error::M3U8("Invalid path encoding for segment file".into()))?;
        args.extend(["-i".into(), input.into()]);
    }
    if audio.is_some() {
        args.extend(["-map".into(), "0:v:0".into(), "-map".into(), "1:a:0".into()]);
    }
    let output_str = output
        .to_str()
        .ok_or_else(|| Error::M3U8("Invalid path encoding for output".into()))?;
    args.extend(["-c".into(), "copy".into(), "-f".into(), "mp4".into(), output_str.into()]);

    let status = Command::new("ffmpeg")
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FFmpegNotFound
            } else {
                Error::FFmpeg(format!("Failed to run ffmpeg: {}", e))
            }
        })?;

    if !status.success() {
        return Err(Error::FFmpeg(format!(
            "ffmpeg exited with status: {}",
            status
        )));
    }

    Ok(())
}
