use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vtwatch_api::{StreamApi, StreamApiConfig};
use vtwatch_core::{classify, GroupBucket};
use vtwatch_notify::chat::{ChatClient, DryRunChat};
use vtwatch_notify::schedule::ScheduleEmbed;
use vtwatch_notify::{LiveWatcher, Scheduler, UpcomingWatcher, WatchConfig};

#[derive(Debug, Parser)]
#[command(name = "vtwatch")]
#[command(about = "VTuber stream notification watcher")]
struct Cli {
    /// Path to the persisted watcher configuration.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run both watch cycles until interrupted.
    Run,
    /// Fetch both feeds once and print per-group counts.
    Check,
    /// Post placeholder schedule messages and persist their ids.
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config).await,
        Commands::Check => check(&cli.config).await,
        Commands::Init => init(&cli.config).await,
    }
}

async fn load_or_default(path: &Path) -> WatchConfig {
    match WatchConfig::load(path).await {
        Ok(config) => config,
        Err(err) => {
            warn!("falling back to default config: {err:#}");
            WatchConfig::default()
        }
    }
}

async fn run(config_path: &Path) -> Result<()> {
    let config = WatchConfig::load(config_path).await?;
    let api = Arc::new(StreamApi::new(StreamApiConfig::default())?);
    // The bundled transport only logs; deployments wire in their own
    // ChatClient implementation here.
    let chat = Arc::new(DryRunChat::default());

    let live = LiveWatcher::new(chat.clone(), api.clone(), config.clone());
    let upcoming = UpcomingWatcher::new(chat, api, config.clone());
    let scheduler = Scheduler::new(
        Box::new(live),
        Box::new(upcoming),
        Duration::from_secs(config.live_interval_secs),
        Duration::from_secs(config.upcoming_interval_secs),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight cycles");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}

async fn check(config_path: &Path) -> Result<()> {
    let config = load_or_default(config_path).await;
    let api = StreamApi::new(StreamApiConfig::default())?;

    let lives = api.fetch_lives().await.context("fetching live streams")?;
    let upcoming = api
        .fetch_upcoming()
        .await
        .context("fetching upcoming streams")?;

    let lives = classify(lives, &config.ignore_groups, config.platforms);
    let upcoming = classify(upcoming, &config.ignore_groups, config.platforms);
    for bucket in GroupBucket::ALL {
        println!(
            "{bucket}: {} live, {} upcoming",
            lives.get(bucket).len(),
            upcoming.get(bucket).len()
        );
    }
    Ok(())
}

async fn init(config_path: &Path) -> Result<()> {
    let mut config = WatchConfig::load(config_path).await?;
    let chat = DryRunChat::default();
    let now = chrono::Utc::now().timestamp();

    for bucket in GroupBucket::ALL {
        let Some(channel) = *config.channels.get(bucket) else {
            warn!(group = %bucket, "no destination channel configured, skipping");
            continue;
        };
        if config.tracking_messages.get(bucket).is_some() {
            info!(group = %bucket, "tracking message already initialized");
            continue;
        }
        let embed = ScheduleEmbed::new(bucket, "*This is a placeholder*".to_string(), now);
        match chat.post_schedule(channel, &embed).await {
            Ok(message) => {
                info!(group = %bucket, %message, "created placeholder schedule message");
                *config.tracking_messages.get_mut(bucket) = Some(message);
            }
            Err(err) => {
                error!(group = %bucket, "failed to create placeholder message: {err}");
            }
        }
    }

    config.save(config_path).await?;
    println!(
        "initialized; tracking message ids persisted to {}",
        config_path.display()
    );
    Ok(())
}
