//! Output directory and path allocation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::config::FilenameStyle;
use crate::error::{Error, Result};
use crate::fs::naming::{format_filename, numbered_filename};
use crate::media::ResolvedMedia;

/// Upper bound on numbered alternatives tried for one filename.
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Suffix of files still being written.
pub const PART_SUFFIX: &str = ".part";

/// Prefix of HLS segment scratch directories.
pub const SCRATCH_DIR_PREFIX: &str = ".m3u8_temp_";

/// Outcome of allocating a destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Free path, now reserved for the caller.
    Fresh(PathBuf),
    /// The file already exists from an earlier run.
    Existing(PathBuf),
}

/// Hands out final paths so no two in-flight items write the same file.
pub struct PathAllocator {
    root: PathBuf,
    style: FilenameStyle,
    reserved: Mutex<HashSet<PathBuf>>,
}

impl PathAllocator {
    pub fn new(root: impl Into<PathBuf>, style: FilenameStyle) -> Self {
        Self {
            root: root.into(),
            style,
            reserved: Mutex::new(HashSet::new()),
        }
    }

    /// Pick the final path for `media`.
    ///
    /// With an id-bearing style an existing file is the same asset, so it is
    /// reported as [`Allocation::Existing`]. With the pretty style a taken
    /// path gets the next free `_2`, `_3`, ... suffix.
    pub async fn allocate(&self, media: &ResolvedMedia) -> Result<Allocation> {
        let filename = format_filename(self.style, media)?;
        let base = self.root.join(&filename);

        let mut reserved = self.reserved.lock().await;

        if self.style.embeds_post_id() {
            if exists(&base).await {
                return Ok(Allocation::Existing(base));
            }
            if !reserved.insert(base.clone()) {
                return Err(Error::Filesystem {
                    path: base.display().to_string(),
                    message: "already being written by another download".into(),
                });
            }
            return Ok(Allocation::Fresh(base));
        }

        let mut candidate = base;
        let mut n = 1;
        while reserved.contains(&candidate) || exists(&candidate).await {
            n += 1;
            if n > MAX_COLLISION_SUFFIX {
                return Err(Error::filesystem(&candidate, "no free filename left"));
            }
            candidate = self.root.join(numbered_filename(&filename, n));
        }

        reserved.insert(candidate.clone());
        Ok(Allocation::Fresh(candidate))
    }

    /// Give back a reservation whose download did not complete.
    pub async fn release(&self, path: &Path) {
        self.reserved.lock().await.remove(path);
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Temporary path a download is written to before being renamed into place.
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Create the output directory and make sure it is writable.
pub async fn ensure_output_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::filesystem(path, e))?;

    let probe = path.join(format!(".write_probe_{}", uuid::Uuid::new_v4()));
    tokio::fs::write(&probe, b"")
        .await
        .map_err(|e| Error::filesystem(path, format!("directory is not writable: {}", e)))?;
    let _ = tokio::fs::remove_file(&probe).await;

    Ok(())
}

/// Remove leftovers of interrupted downloads from `dir`: `.part` files and
/// segment scratch directories. Returns how many entries were removed.
pub async fn remove_partial_downloads(dir: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::filesystem(dir, e))?;

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::filesystem(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);

        let result = if is_dir && name.starts_with(SCRATCH_DIR_PREFIX) {
            tokio::fs::remove_dir_all(&path).await
        } else if !is_dir && name.ends_with(PART_SUFFIX) {
            tokio::fs::remove_file(&path).await
        } else {
            continue;
        };

        match result {
            Ok(()) => {
                tracing::info!("Cleaned up incomplete download: {}", name);
                removed += 1;
            }
            Err(e) => tracing::warn!("Failed to clean up {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}
