pub mod api;
pub mod views;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use icsview_core::{IcsViewError, IcsViewResult, Window};
use serde::{Deserialize, Serialize};

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<IcsViewError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Feed problems are upstream failures; bad dates are the caller's.
pub fn status_for(err: &IcsViewError) -> StatusCode {
    match err {
        IcsViewError::Fetch(_) | IcsViewError::IcsParse(_) | IcsViewError::InvalidRule(_) => {
            StatusCode::BAD_GATEWAY
        }
        IcsViewError::InvalidDate(_) => StatusCode::BAD_REQUEST,
        IcsViewError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Year,
    #[default]
    Month,
    Day,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Year => "year",
            DisplayMode::Month => "month",
            DisplayMode::Day => "day",
        }
    }

    /// Window whose events the view needs. The day view shows its whole
    /// month in the grid, so it loads the month.
    pub fn window(&self, date: NaiveDate, tz: Tz) -> IcsViewResult<Window> {
        match self {
            DisplayMode::Year => Window::year(date, tz),
            DisplayMode::Month | DisplayMode::Day => Window::month(date, tz),
        }
    }
}

/// Query arguments shared by the pages and the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewArgs {
    #[serde(default)]
    pub display: DisplayMode,
    /// Defaults to today in the viewer time zone
    pub date: Option<NaiveDate>,
    /// Hide navigation and open events in a new tab
    #[serde(default)]
    pub embed: bool,
    /// Link target for event entries
    pub target: Option<String>,
    /// Drop the cached feed and fetch it again
    #[serde(default)]
    pub reload: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(status_for(&IcsViewError::Fetch("HTTP 404".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&IcsViewError::InvalidDate("x".into())), StatusCode::BAD_REQUEST);

        let resp = AppError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn day_view_loads_its_month() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();

        let window = DisplayMode::Day.window(date, Tz::UTC).unwrap();

        assert_eq!(window, Window::month(date, Tz::UTC).unwrap());
    }
}
