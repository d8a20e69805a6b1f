use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use icsview_core::{CalendarMonth, FeedClient, FeedLoader, Viewer, Window};
use owo_colors::OwoColorize;

use crate::render::{MonthGrid, side_by_side};

/// Months per row of output
const COLUMNS: usize = 3;

pub async fn run(loader: Arc<FeedLoader<FeedClient>>, year: i32, now: DateTime<Utc>) -> Result<()> {
    let tz = loader.tz();
    let today = now.with_timezone(&tz).date_naive();
    let first = NaiveDate::from_ymd_opt(year, 1, 1).with_context(|| format!("Year {} is out of range", year))?;

    let viewer = Viewer::new(loader, Window::year(first, tz)?);
    let occurrences = viewer.events(now).await?;

    let mut grids = Vec::with_capacity(12);
    for month in 1..=12 {
        let calendar = CalendarMonth::new(year, month, true)?;
        grids.push(MonthGrid::new(&calendar, &occurrences, tz, today)?.lines());
    }

    let name = viewer.feed().await?.name.clone().unwrap_or_else(|| "Calendar".to_string());
    println!("{} {}", name.bold(), format!("({} events in {})", occurrences.len(), year).dimmed());
    println!();
    println!("{}", side_by_side(&grids, COLUMNS));

    Ok(())
}
