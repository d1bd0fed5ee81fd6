//! Error types for the reddit-saved-downloader application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Input errors
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    // Reddit / remote errors
    #[error("Authentication failed: {0}. Refresh the reddit_session cookie from your browser and try again.")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    // Per-item media errors
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Content removed upstream: {0}")]
    ContentGone(String),

    #[error("M3U8 processing error: {0}")]
    M3U8(String),

    // External tool errors
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("FFmpeg not found. Please install ffmpeg and ensure it's in your PATH.")]
    FFmpegNotFound,

    // File system errors
    #[error("Filesystem error at {path}: {message}")]
    Filesystem { path: String, message: String },

    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    #[error("Interrupted")]
    Interrupted,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a filesystem error for `path`.
    pub fn filesystem(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Error::Filesystem {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::ConfigValidation { .. }
            | Error::MissingConfig(_)
            | Error::MalformedInput(_)
            | Error::TomlParse(_) => exit_codes::CONFIG_ERROR,
            Error::Authentication(_) | Error::Network(_) | Error::Http(_) => {
                exit_codes::API_ERROR
            }
            Error::Interrupted => exit_codes::ABORT,
            _ => exit_codes::UNEXPECTED_ERROR,
        }
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
}
