//! Configuration module for the reddit-saved-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Filename styles and input selection
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{AccountConfig, Config, OptionsConfig, CACHE_FILE_NAME, LEDGER_FILE_NAME};
pub use modes::{FilenameStyle, InputMode};
pub use validation::{validate_config, validate_concurrent, validate_cookie, MAX_CONCURRENT};
