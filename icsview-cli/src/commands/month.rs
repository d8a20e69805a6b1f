use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use icsview_core::{CalendarMonth, FeedClient, FeedLoader, Viewer, Window};

use crate::render::{MonthGrid, Render, event_list};

pub async fn run(
    loader: Arc<FeedLoader<FeedClient>>,
    year: i32,
    month: u32,
    fold: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let tz = loader.tz();
    let today = now.with_timezone(&tz).date_naive();

    let grid = CalendarMonth::new(year, month, fold)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("{}-{} is not a valid month", year, month))?;

    let viewer = Viewer::new(loader, Window::month(first, tz)?);
    let occurrences = viewer.events(now).await?;

    println!("{}", MonthGrid::new(&grid, &occurrences, tz, today)?.render());
    println!();
    println!("{}", event_list(&occurrences, tz, today));

    Ok(())
}
