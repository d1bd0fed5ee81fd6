//! Per-item download outcomes.

use std::fmt;
use std::path::PathBuf;

/// Final state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadStatus {
    Success,
    /// Already downloaded in an earlier run.
    SkippedDuplicate,
    /// Nothing downloadable (text post, unsupported host, deleted upstream).
    Skipped,
    Failed,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Success => write!(f, "success"),
            DownloadStatus::SkippedDuplicate => write!(f, "skipped_duplicate"),
            DownloadStatus::Skipped => write!(f, "skipped"),
            DownloadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one post or asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub post_id: String,
    pub status: DownloadStatus,
    pub error_reason: Option<String>,
    pub file_path: Option<PathBuf>,
}

impl DownloadRecord {
    pub fn success(post_id: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            post_id: post_id.into(),
            status: DownloadStatus::Success,
            error_reason: None,
            file_path: Some(file_path),
        }
    }

    pub fn duplicate(post_id: impl Into<String>, file_path: Option<PathBuf>) -> Self {
        Self {
            post_id: post_id.into(),
            status: DownloadStatus::SkippedDuplicate,
            error_reason: None,
            file_path,
        }
    }

    pub fn skipped(post_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            status: DownloadStatus::Skipped,
            error_reason: Some(reason.into()),
            file_path: None,
        }
    }

    pub fn failed(post_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            status: DownloadStatus::Failed,
            error_reason: Some(reason.into()),
            file_path: None,
        }
    }
}
