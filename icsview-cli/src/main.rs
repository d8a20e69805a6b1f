mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use icsview_core::{FeedClient, FeedLoader, ViewerConfig, Window, window::local_midnight};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "icsview")]
#[command(about = "Browse the events of an iCalendar (.ics) feed")]
struct Cli {
    /// Config file (defaults to ~/.config/icsview/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Feed URL or path, overriding the config file
    #[arg(long, global = true)]
    feed: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List events, by default for the configured number of days from today
    Events {
        /// Number of days from today
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        days: Option<u32>,

        /// First day to show (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last day to show, inclusive (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Print a month grid and its events
    Month {
        #[arg(short, long)]
        year: Option<i32>,

        /// 1-12
        #[arg(short, long)]
        month: Option<u32>,

        /// Keep the trailing partial week on its own row
        #[arg(long)]
        no_fold: bool,
    },
    /// Print the twelve month grids of a year
    Year {
        #[arg(short, long)]
        year: Option<i32>,
    },
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();

    let mut config = ViewerConfig::load(cli.config.as_deref())?;
    if let Some(feed) = cli.feed {
        config.feed = Some(feed);
    }

    let tz = config.tz()?;
    let client = FeedClient::new(config.feed_location()?, config.fetch_timeout()?)?;
    let loader = Arc::new(FeedLoader::new(client, tz, config.cache_ttl()?));

    let now = Utc::now();
    let today = now.with_timezone(&tz).date_naive();

    match cli.command {
        Commands::Events { days, from, to } => {
            let window = match (from, to) {
                (Some(from), Some(to)) => {
                    let after = to.succ_opt().context("--to is out of range")?;
                    Window::new(local_midnight(from, tz)?, local_midnight(after, tz)?)?
                }
                _ => Window::next_n_days(now, days.unwrap_or(config.default_days), tz)?,
            };
            commands::events::run(loader, window, now).await
        }
        Commands::Month { year, month, no_fold } => {
            let year = year.unwrap_or(today.year());
            let month = month.unwrap_or(today.month());
            commands::month::run(loader, year, month, !no_fold, now).await
        }
        Commands::Year { year } => {
            commands::year::run(loader, year.unwrap_or(today.year()), now).await
        }
    }
}
