//! Command-line argument definitions using clap.

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, FilenameStyle};

/// Reddit saved-posts media downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "reddit-saved-downloader",
    version,
    about = "Download media from your saved Reddit posts",
    long_about = "Download images, GIFs, Reddit-hosted videos and RedGifs content referenced by \
                  your saved Reddit posts.\n\n\
                  Read posts from an exported saved.json listing (--input) or fetch them live \
                  using your browser's reddit_session cookie (--reddit-session)."
)]
#[command(group(ArgGroup::new("source").args(["input", "reddit_session"]).multiple(false)))]
pub struct Args {
    /// Path to a saved.json listing file.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Value of the reddit_session browser cookie.
    #[arg(short = 'r', long = "reddit-session")]
    pub reddit_session: Option<String>,

    /// Value of the token_v2 browser cookie (optional, improves reliability).
    #[arg(short = 't', long = "token-v2", env = "REDDIT_TOKEN_V2")]
    pub token_v2: Option<String>,

    /// Output directory for downloaded files [default: ./downloads].
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of concurrent downloads [default: 5].
    #[arg(short = 'c', long)]
    pub concurrent: Option<usize>,

    /// Filename style [default: basic].
    #[arg(short, long, value_enum)]
    pub style: Option<FilenameStyleArg>,

    /// Path to log file.
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Where to cache posts fetched from Reddit [default: <output>/saved.json].
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Retries per download after the first attempt [default: 2].
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-request timeout in seconds [default: 30].
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Exit successfully unless every download failed.
    #[arg(long)]
    pub tolerate_failures: bool,

    /// Path to configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hide per-file download messages.
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI filename style argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FilenameStyleArg {
    /// <post_id>.<ext>
    Basic,
    /// <title>.<ext>
    Pretty,
    /// <timestamp>_<post_id>_<title>.<ext>
    Advanced,
}

impl From<FilenameStyleArg> for FilenameStyle {
    fn from(arg: FilenameStyleArg) -> Self {
        match arg {
            FilenameStyleArg::Basic => FilenameStyle::Basic,
            FilenameStyleArg::Pretty => FilenameStyle::Pretty,
            FilenameStyleArg::Advanced => FilenameStyle::Advanced,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        // Input selection: an explicit choice on the command line replaces the config file's
        if let Some(input) = self.input {
            config.options.input = Some(input);
        }

        if let Some(session) = self.reddit_session {
            config.account.reddit_session = Some(session);
            config.options.input = None;
        }

        if let Some(token) = self.token_v2 {
            config.account.token_v2 = Some(token);
        }

        if let Some(output) = self.output {
            config.options.output_directory = output;
        }

        if let Some(concurrent) = self.concurrent {
            config.options.concurrent = concurrent;
        }

        if let Some(style) = self.style {
            config.options.filename_style = style.into();
        }

        if let Some(log) = self.log {
            config.options.log_file = Some(log);
        }

        if let Some(cache) = self.cache {
            config.options.cache_file = Some(cache);
        }

        if let Some(retries) = self.retries {
            config.options.retries = retries;
        }

        if let Some(timeout) = self.timeout {
            config.options.request_timeout_seconds = timeout;
        }

        // Boolean flags (only override if set to non-default)
        if self.tolerate_failures {
            config.options.tolerate_failures = true;
        }

        if self.quiet {
            config.options.show_downloads = false;
            config.options.show_skipped_downloads = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputMode;

    #[test]
    fn test_input_and_session_are_exclusive() {
        let result = Args::try_parse_from([
            "reddit-saved-downloader",
            "-i",
            "saved.json",
            "-r",
            "cookie",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_flags_merge() {
        let args = Args::try_parse_from([
            "reddit-saved-downloader",
            "-i",
            "saved.json",
            "-o",
            "out",
            "-c",
            "3",
            "-s",
            "advanced",
            "-l",
            "run.log",
        ])
        .unwrap();

        let mut config = Config::default();
        args.merge_into_config(&mut config);

        assert_eq!(
            config.input_mode().unwrap(),
            InputMode::File(PathBuf::from("saved.json"))
        );
        assert_eq!(config.options.output_directory, PathBuf::from("out"));
        assert_eq!(config.options.concurrent, 3);
        assert_eq!(config.options.filename_style, FilenameStyle::Advanced);
        assert_eq!(config.options.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_session_overrides_configured_input() {
        let args =
            Args::try_parse_from(["reddit-saved-downloader", "--reddit-session", "cookie"]).unwrap();

        let mut config = Config::default();
        config.options.input = Some(PathBuf::from("old.json"));
        args.merge_into_config(&mut config);

        assert_eq!(config.input_mode().unwrap(), InputMode::Remote);
    }
}
