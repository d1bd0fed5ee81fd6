//! Configuration structures and loading logic.

use crate::config::modes::{FilenameStyle, InputMode};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the ledger file kept inside the output directory.
pub const LEDGER_FILE_NAME: &str = ".reddit-saved-ledger";

/// Default name of the listing cache written after a remote fetch.
pub const CACHE_FILE_NAME: &str = "saved.json";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Reddit session credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Value of the `reddit_session` browser cookie.
    #[serde(default)]
    pub reddit_session: Option<String>,

    /// Value of the `token_v2` browser cookie (optional, improves reliability).
    #[serde(default)]
    pub token_v2: Option<String>,

    /// Browser user agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Download options configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Listing file to read instead of fetching from Reddit.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Directory downloads are written to.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,

    /// Where the fetched listing is persisted after a remote fetch.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    /// Maximum number of downloads in flight.
    #[serde(default = "default_concurrent")]
    pub concurrent: usize,

    /// Filename style for downloaded media.
    #[serde(default)]
    pub filename_style: FilenameStyle,

    /// Retries per download after the first attempt.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,

    /// Lower bound of the random delay between listing pages (ms).
    #[serde(default = "default_page_delay_min")]
    pub page_delay_min_ms: u64,

    /// Upper bound of the random delay between listing pages (ms).
    #[serde(default = "default_page_delay_max")]
    pub page_delay_max_ms: u64,

    /// Exit successfully unless every download failed.
    #[serde(default)]
    pub tolerate_failures: bool,

    /// Optional log file, in addition to the console.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Whether to log each finished download.
    #[serde(default = "default_true")]
    pub show_downloads: bool,

    /// Whether to log skipped items.
    #[serde(default = "default_true")]
    pub show_skipped_downloads: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_directory: default_output_directory(),
            cache_file: None,
            concurrent: default_concurrent(),
            filename_style: FilenameStyle::default(),
            retries: default_retries(),
            request_timeout_seconds: default_timeout(),
            page_delay_min_ms: default_page_delay_min(),
            page_delay_max_ms: default_page_delay_max(),
            tolerate_failures: false,
            log_file: None,
            show_downloads: true,
            show_skipped_downloads: true,
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            reddit_session: None,
            token_v2: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_concurrent() -> usize {
    5
}

fn default_retries() -> u32 {
    2
}

fn default_timeout() -> u64 {
    30
}

fn default_page_delay_min() -> u64 {
    1000
}

fn default_page_delay_max() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("Configuration file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Default config file location (`~/.config/reddit-saved-downloader/config.toml` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "reddit-saved-downloader")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Which source this run reads saved posts from.
    ///
    /// An explicit input file wins over stored credentials.
    pub fn input_mode(&self) -> Result<InputMode> {
        if let Some(input) = &self.options.input {
            return Ok(InputMode::File(input.clone()));
        }
        if self.account.reddit_session.is_some() {
            return Ok(InputMode::Remote);
        }
        Err(Error::MissingConfig(
            "input source (pass --input <saved.json> or --reddit-session <cookie>)".to_string(),
        ))
    }

    /// Path of the dedup ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.options.output_directory.join(LEDGER_FILE_NAME)
    }

    /// Path the remote listing is cached to.
    pub fn cache_path(&self) -> PathBuf {
        self.options
            .cache_file
            .clone()
            .unwrap_or_else(|| self.options.output_directory.join(CACHE_FILE_NAME))
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.options.request_timeout_seconds)
    }
}
