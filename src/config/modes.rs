//! Filename style and input mode definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How downloaded files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStyle {
    /// `<post_id>.<ext>` (default).
    #[default]
    Basic,
    /// `<title>.<ext>`, disambiguated with a numeric suffix.
    Pretty,
    /// `<timestamp>_<post_id>_<title>.<ext>`.
    Advanced,
}

impl FilenameStyle {
    /// Whether names in this style embed the post ID, making them unique per post.
    pub fn embeds_post_id(&self) -> bool {
        matches!(self, FilenameStyle::Basic | FilenameStyle::Advanced)
    }
}

impl fmt::Display for FilenameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilenameStyle::Basic => write!(f, "basic"),
            FilenameStyle::Pretty => write!(f, "pretty"),
            FilenameStyle::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for FilenameStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(FilenameStyle::Basic),
            "pretty" => Ok(FilenameStyle::Pretty),
            "advanced" => Ok(FilenameStyle::Advanced),
            _ => Err(format!("Unknown filename style: {}", s)),
        }
    }
}

/// Where saved posts come from for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// A previously exported or cached listing file.
    File(PathBuf),
    /// Live fetch from Reddit using browser cookies.
    Remote,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::File(path) => write!(f, "file ({})", path.display()),
            InputMode::Remote => write!(f, "reddit account"),
        }
    }
}
