//! Configuration validation logic.

use crate::config::loader::Config;
use crate::config::modes::InputMode;
use crate::error::{Error, Result};
use regex::Regex;

/// Upper bound on concurrent downloads.
pub const MAX_CONCURRENT: usize = 64;

/// Upper bound on per-download retries.
const MAX_RETRIES: u32 = 10;

/// Minimum length for a session cookie value.
const MIN_COOKIE_LENGTH: usize = 20;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    match config.input_mode()? {
        InputMode::File(path) => {
            if !path.is_file() {
                return Err(Error::ConfigValidation {
                    field: "input".to_string(),
                    message: format!("Input file does not exist: {}", path.display()),
                });
            }
        }
        InputMode::Remote => {
            validate_cookie("reddit_session", config.account.reddit_session.as_deref())?;
        }
    }

    if config.account.token_v2.is_some() {
        validate_cookie("token_v2", config.account.token_v2.as_deref())?;
    }

    validate_concurrent(config.options.concurrent)?;

    if config.options.retries > MAX_RETRIES {
        return Err(Error::ConfigValidation {
            field: "retries".to_string(),
            message: format!("At most {} retries allowed (got {})", MAX_RETRIES, config.options.retries),
        });
    }

    if config.options.request_timeout_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "request_timeout_seconds".to_string(),
            message: "Timeout must be at least 1 second".to_string(),
        });
    }

    if config.options.page_delay_min_ms > config.options.page_delay_max_ms {
        return Err(Error::ConfigValidation {
            field: "page_delay_min_ms".to_string(),
            message: "Minimum page delay exceeds the maximum".to_string(),
        });
    }

    Ok(())
}

/// Validate the concurrency limit.
pub fn validate_concurrent(concurrent: usize) -> Result<()> {
    if concurrent == 0 || concurrent > MAX_CONCURRENT {
        return Err(Error::ConfigValidation {
            field: "concurrent".to_string(),
            message: format!(
                "Concurrent downloads must be between 1 and {} (got {})",
                MAX_CONCURRENT, concurrent
            ),
        });
    }
    Ok(())
}

/// Validate a browser cookie value.
pub fn validate_cookie(field: &str, value: Option<&str>) -> Result<()> {
    let value = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Err(Error::MissingConfig(field.to_string())),
    };

    if value.len() < MIN_COOKIE_LENGTH {
        return Err(Error::ConfigValidation {
            field: field.to_string(),
            message: format!(
                "Cookie must be at least {} characters (got {})",
                MIN_COOKIE_LENGTH,
                value.len()
            ),
        });
    }

    // Check for placeholder values
    let lower = value.to_lowercase();
    if lower.contains("replaceme") || lower.contains("your_") {
        return Err(Error::ConfigValidation {
            field: field.to_string(),
            message: "Cookie appears to be a placeholder. Copy the value from your browser."
                .to_string(),
        });
    }

    // Cookie values are URL-safe base64 / JWT text; anything else was mis-pasted.
    let cookie_pattern = Regex::new(r"^[A-Za-z0-9._%+/=-]+$").unwrap();
    if !cookie_pattern.is_match(value) {
        return Err(Error::ConfigValidation {
            field: field.to_string(),
            message: "Cookie contains invalid characters (paste only the value, not 'name=value;')"
                .to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const COOKIE: &str = "eyJhbGciOiJSUzI1NiIsImtpZCI6IlNIQTI1NjpzS3dsMnlsV0VtMjVmcXhwTU40cWY4MXE2OWFFdXFmOT";

    #[test]
    fn test_valid_cookie() {
        assert!(validate_cookie("reddit_session", Some(COOKIE)).is_ok());
    }

    #[test]
    fn test_missing_cookie() {
        assert!(matches!(
            validate_cookie("reddit_session", None),
            Err(Error::MissingConfig(_))
        ));
        assert!(matches!(
            validate_cookie("reddit_session", Some("   ")),
            Err(Error::MissingConfig(_))
        ));
    }

    #[test]
    fn test_cookie_placeholder_and_junk() {
        assert!(validate_cookie("token_v2", Some("REPLACEME_REPLACEME_REPLACEME")).is_err());
        assert!(validate_cookie("token_v2", Some("short")).is_err());
        assert!(validate_cookie("token_v2", Some("reddit_session=abcdefghijklmnopqrstuvwxyz;")).is_err());
    }

    #[test]
    fn test_concurrent_bounds() {
        assert!(validate_concurrent(1).is_ok());
        assert!(validate_concurrent(MAX_CONCURRENT).is_ok());
        assert!(validate_concurrent(0).is_err());
        assert!(validate_concurrent(MAX_CONCURRENT + 1).is_err());
    }

    #[test]
    fn test_missing_input_file() {
        let mut config = Config::default();
        config.options.input = Some(PathBuf::from("/nonexistent/saved.json"));
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_remote_config_valid() {
        let mut config = Config::default();
        config.account.reddit_session = Some(COOKIE.to_string());
        assert!(validate_config(&config).is_ok());
    }
}
