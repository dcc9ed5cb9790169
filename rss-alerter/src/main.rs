use anyhow::Context;
use clap::Parser;
use email_notifier::SmtpMailSender;
use rss_alerter::{
    AlerterError, AppConfig, CursorStore, FeedProcessor, FilterPolicy, HipChatPoster,
    HttpFeedSource, NotificationDispatcher, ResolvedFeedConfig, RunCoordinator,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Poll configured feeds once and alert on entries newer than each feed's watermark.
#[derive(Debug, Parser)]
#[command(name = "rss-alerter", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "/etc/rss-alerter/config.toml")]
    config: PathBuf,

    /// Debug-level logging (RUST_LOG still takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Log alerts only: no email, no chat, no watermark updates
    #[arg(long)]
    dry_run: bool,

    /// Only process these feeds, given as group/feed (repeatable)
    #[arg(long = "feed", value_name = "GROUP/FEED")]
    feeds: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(path: &Path) -> rss_alerter::Result<AppConfig> {
    let config = AppConfig::load(path)?;
    config.prepare_state_dir()?;
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<ExitCode> {
    let mut feeds = select_feeds(config.resolved_feeds(), &cli.feeds)?;

    if cli.dry_run {
        info!("Dry run: only the log channel is active and watermarks are left alone");
        for feed in &mut feeds {
            feed.channels.log.enabled = true;
            feed.channels.email.enabled = false;
            feed.channels.chat.enabled = false;
        }
    }

    let source = HttpFeedSource::new(config.fetch_config())
        .map_err(AlerterError::from)
        .context("cannot set up feed fetcher")?;
    let chat = HipChatPoster::new(config.request_timeout())
        .map_err(AlerterError::from)
        .context("cannot set up chat client")?;
    let mail = SmtpMailSender::new(config.request_timeout());

    let dispatcher = NotificationDispatcher::new(Arc::new(mail), Arc::new(chat));
    let policy = FilterPolicy {
        max_entry_age: config.max_entry_age(),
        persist: !cli.dry_run,
    };
    let processor = FeedProcessor::new(
        Arc::new(source),
        CursorStore::new(config.state_dir.clone()),
        dispatcher,
        policy,
    );

    let summary = RunCoordinator::new(processor, config.max_concurrent_feeds)
        .run_all(&feeds)
        .await;

    if summary.persist_failures() > 0 {
        warn!("{} watermarks could not be saved", summary.persist_failures());
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn select_feeds(
    feeds: Vec<ResolvedFeedConfig>,
    wanted: &[String],
) -> anyhow::Result<Vec<ResolvedFeedConfig>> {
    if wanted.is_empty() {
        return Ok(feeds);
    }

    for name in wanted {
        if !feeds.iter().any(|feed| feed.id.to_string() == *name) {
            anyhow::bail!("unknown feed '{}', expected group/feed", name);
        }
    }

    Ok(feeds
        .into_iter()
        .filter(|feed| wanted.contains(&feed.id.to_string()))
        .collect())
}
