use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use icsview_core::{FeedClient, FeedLoader, Viewer, Window};

use crate::render::event_list;

pub async fn run(loader: Arc<FeedLoader<FeedClient>>, window: Window, now: DateTime<Utc>) -> Result<()> {
    let tz = loader.tz();
    let viewer = Viewer::new(loader, window);
    let occurrences = viewer.events(now).await?;

    println!("{}", event_list(&occurrences, tz, now.with_timezone(&tz).date_naive()));

    Ok(())
}
