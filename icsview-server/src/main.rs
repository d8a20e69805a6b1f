use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use icsview_core::ViewerConfig;
use icsview_server::{app, state::AppState};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "icsview-server")]
#[command(about = "Serve year, month and day views of an iCalendar feed")]
struct Args {
    /// Config file (defaults to ~/.config/icsview/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feed URL or path, overriding the config file
    #[arg(short, long)]
    feed: Option<String>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    listen: Option<String>,
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let args = Args::parse();
    let mut config = ViewerConfig::load(args.config.as_deref())?;
    if let Some(feed) = args.feed {
        config.feed = Some(feed);
    }
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let state = AppState::new(&config)?;

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen))?;
    tracing::info!(%addr, feed = config.feed.as_deref().unwrap_or_default(), "icsview-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
