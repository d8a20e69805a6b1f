use std::sync::Arc;

use anyhow::Result;
use chrono_tz::Tz;
use icsview_core::{FeedClient, FeedLoader, ViewerConfig, Viewer, Window};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    // One loader for every request, so the feed cache is shared
    loader: Arc<FeedLoader<FeedClient>>,
    default_days: u32,
}

impl AppState {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let client = FeedClient::new(config.feed_location()?, config.fetch_timeout()?)?;
        let loader = FeedLoader::new(client, config.tz()?, config.cache_ttl()?);

        Ok(AppState {
            loader: Arc::new(loader),
            default_days: config.default_days,
        })
    }

    pub fn loader(&self) -> &FeedLoader<FeedClient> {
        &self.loader
    }

    pub fn tz(&self) -> Tz {
        self.loader.tz()
    }

    pub fn default_days(&self) -> u32 {
        self.default_days
    }

    pub fn viewer(&self, window: Window) -> Viewer<FeedClient> {
        Viewer::new(Arc::clone(&self.loader), window)
    }
}
