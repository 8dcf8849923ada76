use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use immowatch::api::ImmoScoutSource;
use immowatch::config::{AppConfig, CONFIG_PATH, TOKEN_ENV_VAR};
use immowatch::engine::FilterRules;
use immowatch::reporter::{self, Sink, StdoutSink, TelegramSink};
use immowatch::tick::{TickState, run_tick};

/// Timeout applied to every outbound call (search and Telegram). A hung
/// request must not block a tick forever.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "immowatch", about = "ImmobilienScout24 listing watcher")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Print notifications to stdout instead of sending them to Telegram
    #[arg(long)]
    dry_run: bool,

    /// Run a single tick and exit (for external schedulers)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;
    info!("Loaded config from {}", args.config.display());

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let sink: Box<dyn Sink> = if args.dry_run {
        info!("Dry-run mode: notifications go to stdout");
        Box::new(StdoutSink)
    } else {
        let token = config.telegram_token().with_context(|| {
            format!("telegram token missing — set [telegram] token or {TOKEN_ENV_VAR}")
        })?;
        let chat_id = match config.telegram.chat_id {
            Some(id) => id,
            None => {
                let id = reporter::resolve_chat_id(&client, &token).await?;
                info!("Telegram chat id resolved as {id}");
                id
            }
        };
        Box::new(TelegramSink::new(client.clone(), token, chat_id))
    };

    let source = ImmoScoutSource::new(client, config.search.url.clone());
    let rules = config.search.rules();
    let notify_on_warmup = config.immowatch.include_existing_offers;
    let poll_interval = Duration::from_secs(config.immowatch.poll_interval_secs);
    let mut state = TickState::new();

    info!(
        "Watching {} every {}s",
        config.search.url, config.immowatch.poll_interval_secs
    );

    // First tick runs immediately so the seen-set is primed without
    // waiting a full interval.
    run_and_log(&source, sink.as_ref(), &rules, notify_on_warmup, &mut state).await;

    if !args.once {
        info!(
            "Entering polling loop (interval: {}s). Press Ctrl+C to stop.",
            config.immowatch.poll_interval_secs
        );
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {
                    run_and_log(&source, sink.as_ref(), &rules, notify_on_warmup, &mut state).await;
                }
            }
        }
    }

    reporter::report_summary(&state.summary());
    Ok(())
}

/// One tick; per-tick errors are logged and never kill the process — the
/// next scheduled tick is the retry.
async fn run_and_log(
    source: &ImmoScoutSource,
    sink: &dyn Sink,
    rules: &FilterRules,
    notify_on_warmup: bool,
    state: &mut TickState,
) {
    match run_tick(source, sink, rules, notify_on_warmup, state).await {
        Ok(report) => {
            info!(
                "Tick complete: {} fetched, {} kept, {} new, {} notified ({} sink failures)",
                report.fetched, report.kept, report.fresh, report.notified, report.sink_failures
            );
            reporter::report_tick(&report);
        }
        Err(e) => warn!("Tick failed: {:#}", anyhow::Error::from(e)),
    }
}
