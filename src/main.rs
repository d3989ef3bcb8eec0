mod commands;
mod feed;
mod render;
mod utils;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use webcal_sync_core::config::{Config, FeedConfig};

#[derive(Parser)]
#[command(name = "webcal-sync")]
#[command(about = "Mirror webcal feeds into a Google calendar")]
struct Cli {
    /// Config file (defaults to ~/.config/webcal-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs and list every event change
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every feed and write the changes to Google Calendar
    Sync {
        /// Only operate on this feed (by URL)
        #[arg(short, long)]
        feed: Option<String>,
    },
    /// Show what a sync would change, without writing anything
    Status {
        /// Only operate on this feed (by URL)
        #[arg(short, long)]
        feed: Option<String>,
    },
    /// Connect a Google account
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Auth => commands::auth::run().await,
        Commands::Sync { feed } => {
            let config = load_config(cli.config.as_deref())?;
            let feeds = resolve_feeds(&config, feed.as_deref())?;
            commands::sync::run(&config, &feeds, cli.verbose).await
        }
        Commands::Status { feed } => {
            let config = load_config(cli.config.as_deref())?;
            let feeds = resolve_feeds(&config, feed.as_deref())?;
            commands::status::run(&config, &feeds, cli.verbose).await
        }
    }
}

/// Logs go to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "webcal_sync=debug"
    } else {
        "webcal_sync=info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn resolve_feeds(config: &Config, feed_filter: Option<&str>) -> Result<Vec<FeedConfig>> {
    let feeds = config.select_feeds(feed_filter)?;

    if feeds.is_empty() {
        anyhow::bail!(
            "No feeds configured.\n\n\
            Add one to your config file:\n\n  \
            [[feeds]]\n  \
            url = \"https://example.com/calendar.ics\""
        );
    }

    Ok(feeds)
}
