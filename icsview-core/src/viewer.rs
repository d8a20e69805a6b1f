//! A calendar viewer: a feed plus a window that can be moved around.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::IcsViewResult;
use crate::feed::{FeedLoader, FeedSource};
use crate::ics::ParsedFeed;
use crate::resolver::{Occurrence, resolve};
use crate::window::Window;

/// Views of one feed share a single [`FeedLoader`] and its cache.
pub struct Viewer<S> {
    loader: Arc<FeedLoader<S>>,
    window: Window,
}

impl<S: FeedSource> Viewer<S> {
    pub fn new(loader: Arc<FeedLoader<S>>, window: Window) -> Self {
        Viewer { loader, window }
    }

    /// A viewer over the `days` days starting today.
    pub fn next_n_days(loader: Arc<FeedLoader<S>>, now: DateTime<Utc>, days: u32) -> IcsViewResult<Self> {
        let window = Window::next_n_days(now, days, loader.tz())?;
        Ok(Viewer::new(loader, window))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn tz(&self) -> Tz {
        self.loader.tz()
    }

    pub fn loader(&self) -> &Arc<FeedLoader<S>> {
        &self.loader
    }

    pub fn prev_month(&mut self) -> IcsViewResult<()> {
        self.shift(-1)
    }

    pub fn next_month(&mut self) -> IcsViewResult<()> {
        self.shift(1)
    }

    pub fn prev_year(&mut self) -> IcsViewResult<()> {
        self.shift(-12)
    }

    pub fn next_year(&mut self) -> IcsViewResult<()> {
        self.shift(12)
    }

    fn shift(&mut self, months: i32) -> IcsViewResult<()> {
        self.window = self.window.shift_months(months, self.tz())?;
        Ok(())
    }

    /// Occurrences in the current window, loading the feed if needed.
    pub async fn events(&self, now: DateTime<Utc>) -> IcsViewResult<Vec<Occurrence>> {
        let definitions = self.loader.definitions().await?;
        resolve(&definitions, &self.window, now, self.tz())
    }

    pub async fn feed(&self) -> IcsViewResult<Arc<ParsedFeed>> {
        self.loader.feed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IcsViewError;
    use crate::feed::DEFAULT_CACHE_TTL;
    use chrono::{NaiveDate, TimeZone};

    struct StaticFeed(&'static str);

    impl FeedSource for StaticFeed {
        async fn fetch(&self) -> IcsViewResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenFeed;

    impl FeedSource for BrokenFeed {
        async fn fetch(&self) -> IcsViewResult<String> {
            Err(IcsViewError::Fetch("HTTP 404 Not Found".into()))
        }
    }

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
X-WR-CALNAME:Radio Club\r\n\
BEGIN:VEVENT\r\n\
UID:net\r\n\
SUMMARY:Weekly net\r\n\
DTSTART:20240101T190000Z\r\n\
DURATION:PT1H\r\n\
RRULE:FREQ=WEEKLY\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn january(source: StaticFeed) -> Viewer<StaticFeed> {
        let loader = Arc::new(FeedLoader::new(source, Tz::UTC, DEFAULT_CACHE_TTL));
        let window = Window::month(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), Tz::UTC).unwrap();
        Viewer::new(loader, window)
    }

    #[tokio::test]
    async fn test_events_follow_navigation() {
        let mut viewer = january(StaticFeed(FEED));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 19, 30, 0).unwrap();

        let jan = viewer.events(now).await.unwrap();
        assert_eq!(jan.len(), 5);
        assert_eq!(jan.iter().filter(|o| o.in_progress).count(), 1);
        assert_eq!(jan.iter().filter(|o| o.past).count(), 2);

        viewer.next_month().unwrap();
        let feb = viewer.events(now).await.unwrap();
        assert_eq!(feb.len(), 4);
        assert!(feb.iter().all(|o| !o.past && !o.in_progress));

        viewer.prev_year().unwrap();
        assert!(viewer.events(now).await.unwrap().is_empty());

        viewer.next_year().unwrap();
        viewer.prev_month().unwrap();
        assert_eq!(viewer.window().start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_feed_name() {
        let viewer = january(StaticFeed(FEED));

        assert_eq!(viewer.feed().await.unwrap().name.as_deref(), Some("Radio Club"));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let loader = Arc::new(FeedLoader::new(BrokenFeed, Tz::UTC, DEFAULT_CACHE_TTL));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let viewer = Viewer::next_n_days(loader, now, 60).unwrap();

        let err = viewer.events(now).await.unwrap_err();

        assert!(matches!(err, IcsViewError::Fetch(ref msg) if msg.contains("404")));
    }
}
