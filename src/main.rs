//! Reddit Saved Downloader - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};

use reddit_saved_downloader::{
    api::{Fetcher, HttpFetcher, RedditApi, SessionCookies},
    cli::Args,
    config::{validate_config, Config, InputMode},
    dedup::DedupLedger,
    download::{shutdown_channel, DownloadPool, DownloadStatus, Pipeline, RetryPolicy},
    error::{Error, Result},
    fs::{ensure_output_dir, remove_partial_downloads},
    logging::init_logging,
    media::MediaResolver,
    output::{
        create_item_bar, print_banner, print_config_summary, print_error, print_info,
        print_success, print_summary, print_warning,
    },
    source::{FileSource, PostSource, RemoteSource},
};

#[tokio::main]
async fn main() -> ExitCode {
    // Bare invocation prints usage
    if std::env::args_os().len() <= 1 {
        let _ = Args::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();
    let debug = args.debug;

    // Load configuration
    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) if path.exists() => Config::load(path)?,
        Some(path) if args.config.is_some() => {
            return Err(Error::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )))
        }
        _ => Config::default(),
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);
    if config.options.input.is_none() && config.account.reddit_session.is_none() {
        config.account.reddit_session = std::env::var("REDDIT_SESSION").ok();
    }

    validate_config(&config)?;

    init_logging(debug, config.options.log_file.as_deref())?;

    print_banner();

    let input_mode = config.input_mode()?;
    let output_dir = config.options.output_directory.clone();
    print_config_summary(
        &input_mode.to_string(),
        &output_dir.display().to_string(),
        &config.options.filename_style.to_string(),
        config.options.concurrent,
    );

    ensure_output_dir(&output_dir).await?;
    let cleaned = remove_partial_downloads(&output_dir).await?;
    if cleaned > 0 {
        print_info(&format!("Removed {} incomplete downloads", cleaned));
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        &config.account.user_agent,
        config.request_timeout(),
    )?);

    let mut source: Box<dyn PostSource> = match &input_mode {
        InputMode::File(path) => Box::new(FileSource::open(path).await?),
        InputMode::Remote => {
            let session = config
                .account
                .reddit_session
                .clone()
                .ok_or_else(|| Error::MissingConfig("reddit_session".into()))?;
            let cookies = SessionCookies::new(session, config.account.token_v2.clone());
            if !cookies.has_token_v2() {
                print_warning("No token_v2 cookie given; Reddit may reject the session");
            }

            print_info("Fetching saved posts from Reddit...");
            let api = RedditApi::new(fetcher.clone(), cookies);
            Box::new(
                RemoteSource::new(api)
                    .with_cache(config.cache_path())
                    .with_page_delay(
                        Duration::from_millis(config.options.page_delay_min_ms),
                        Duration::from_millis(config.options.page_delay_max_ms),
                    ),
            )
        }
    };

    let ledger = Arc::new(DedupLedger::open(&config.ledger_path()).await?);
    tracing::info!("{} posts already downloaded", ledger.len().await);

    let retry = RetryPolicy::with_retries(config.options.retries);
    let resolver = MediaResolver::new(fetcher.clone()).with_retry(retry);
    let pool = DownloadPool::new(
        fetcher,
        ledger.clone(),
        &output_dir,
        config.options.filename_style,
        config.options.concurrent,
    )
    .with_retry(retry);

    // Ctrl-C stops the run
    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing up...");
            trigger.trigger();
        }
    });

    let bar = create_item_bar("Downloading", false);
    let show_downloads = config.options.show_downloads;
    let show_skipped = config.options.show_skipped_downloads;

    let pipeline = Pipeline {
        resolver: &resolver,
        ledger: &ledger,
        pool: &pool,
        channel_capacity: config.options.concurrent * 2,
    };
    let outcome = pipeline
        .run(
            source.as_mut(),
            shutdown,
            || bar.inc_length(1),
            |record| {
                bar.inc(1);
                let path = record
                    .file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                match record.status {
                    DownloadStatus::Success if show_downloads => {
                        bar.suspend(|| print_success(&format!("Downloaded {}", path)));
                    }
                    DownloadStatus::Skipped if show_skipped => {
                        let reason = record.error_reason.as_deref().unwrap_or_default();
                        bar.suspend(|| print_info(&format!("Skipped {}: {}", record.post_id, reason)));
                    }
                    DownloadStatus::SkippedDuplicate => {
                        tracing::debug!("Already downloaded: {}", record.post_id);
                    }
                    _ => {}
                }
            },
        )
        .await;
    bar.finish_and_clear();

    print_summary(&outcome.report);

    if let Some(error) = outcome.error {
        return Err(error);
    }

    Ok(outcome.report.exit_code(config.options.tolerate_failures))
}
