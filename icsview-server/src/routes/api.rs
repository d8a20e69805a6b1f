//! JSON endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::Utc;
use icsview_core::{Occurrence, Window};
use serde::{Deserialize, Serialize};

use crate::routes::{AppError, DisplayMode};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/upcoming", get(list_upcoming))
        .route("/api/calendar", get(calendar_info))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub display: DisplayMode,
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<u32>,
}

/// Occurrences in a window
#[derive(Serialize)]
pub struct EventsResponse {
    pub window: Window,
    pub events: Vec<Occurrence>,
}

/// Feed metadata returned by API
#[derive(Serialize)]
pub struct CalendarInfo {
    pub name: Option<String>,
    pub events: usize,
    pub active: usize,
    pub timezone: String,
}

/// GET /api/events - Occurrences in the year, month or day of `date`
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, AppError> {
    let now = Utc::now();
    let tz = state.tz();
    let date = query
        .date
        .unwrap_or_else(|| now.with_timezone(&tz).date_naive());

    let window = match query.display {
        DisplayMode::Year => Window::year(date, tz)?,
        DisplayMode::Month => Window::month(date, tz)?,
        DisplayMode::Day => Window::day(date, tz)?,
    };
    let events = state.viewer(window).events(now).await?;

    Ok(Json(EventsResponse { window, events }))
}

/// GET /api/upcoming - Occurrences from today for `days` days
async fn list_upcoming(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<EventsResponse>, AppError> {
    let now = Utc::now();
    let days = query.days.unwrap_or(state.default_days());

    let window = Window::next_n_days(now, days, state.tz())?;
    let events = state.viewer(window).events(now).await?;

    Ok(Json(EventsResponse { window, events }))
}

/// GET /api/calendar - Name and size of the feed
async fn calendar_info(State(state): State<AppState>) -> Result<Json<CalendarInfo>, AppError> {
    let feed = state.loader().feed().await?;

    Ok(Json(CalendarInfo {
        name: feed.name.clone(),
        events: feed.definitions.len(),
        active: feed.active.len(),
        timezone: state.tz().name().to_string(),
    }))
}
