//! Core of icsview, a viewer for iCalendar (.ics) feeds.
//!
//! - [`feed`] fetches a feed and caches the parsed result
//! - [`resolver`] turns event definitions into the occurrences overlapping a
//!   [`Window`], expanding recurrence rules as needed
//! - [`grid`] lays a month out in week rows for display

pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod grid;
pub mod ics;
pub mod recurrence;
pub mod resolver;
pub mod viewer;
pub mod window;

pub use config::ViewerConfig;
pub use error::{IcsViewError, IcsViewResult};
pub use event::{EventDefinition, EventStatus, EventTime, Recurrence};
pub use feed::{FeedClient, FeedLoader, FeedLocation, FeedSource};
pub use grid::{CalendarDay, CalendarMonth};
pub use ics::{ParsedFeed, parse_feed};
pub use resolver::{Occurrence, Phase, resolve};
pub use viewer::Viewer;
pub use window::Window;
