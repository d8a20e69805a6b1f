//! Event definitions as declared in the calendar feed.
//!
//! A definition is immutable once parsed. Concrete instances within a window
//! are produced by the resolver as [`Occurrence`](crate::resolver::Occurrence)s.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A date value as written in the feed, before it is pinned to an instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTime {
    /// All-day value (`VALUE=DATE`)
    Date(NaiveDate),
    /// `20240101T100000Z`
    DateTimeUtc(DateTime<Utc>),
    /// `20240101T100000`, local time of whoever reads the calendar
    DateTimeFloating(NaiveDateTime),
    /// `DTSTART;TZID=Europe/Berlin:20240101T100000`
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Resolve to an instant. Floating values and all-day dates are read in
    /// `fallback`; so are zoned values whose TZID is not a known IANA name.
    pub fn to_utc(&self, fallback: Tz) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(d) => local_to_utc(&d.and_hms_opt(0, 0, 0)?, fallback),
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::DateTimeFloating(dt) => local_to_utc(dt, fallback),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<Tz>() {
                Ok(tz) => local_to_utc(datetime, tz),
                Err(_) => {
                    tracing::warn!(tzid = %tzid, "TZID is not an IANA time zone, using {}", fallback);
                    local_to_utc(datetime, fallback)
                }
            },
        }
    }

    /// Zone the value is read in: UTC, its TZID, or `fallback`.
    pub fn zone(&self, fallback: Tz) -> Tz {
        match self {
            EventTime::DateTimeUtc(_) => Tz::UTC,
            EventTime::DateTimeZoned { tzid, .. } => tzid.parse().unwrap_or(fallback),
            EventTime::Date(_) | EventTime::DateTimeFloating(_) => fallback,
        }
    }

    /// Format as an RFC 5545 property value including parameters,
    /// e.g. `;TZID=Europe/Berlin:20240101T100000`.
    ///
    /// Floating and all-day values are pinned to `fallback` because the
    /// recurrence engine works on instants.
    pub fn to_ics_property(&self, fallback: Tz) -> String {
        match self {
            EventTime::Date(d) => format!(";TZID={}:{}T000000", fallback.name(), d.format("%Y%m%d")),
            EventTime::DateTimeUtc(dt) => format!(":{}", dt.format("%Y%m%dT%H%M%SZ")),
            EventTime::DateTimeFloating(dt) => {
                format!(";TZID={}:{}", fallback.name(), dt.format("%Y%m%dT%H%M%S"))
            }
            EventTime::DateTimeZoned { datetime, tzid } => {
                let name = match tzid.parse::<Tz>() {
                    Ok(tz) => tz.name().to_string(),
                    Err(_) => fallback.name().to_string(),
                };
                format!(";TZID={}:{}", name, datetime.format("%Y%m%dT%H%M%S"))
            }
        }
    }
}

/// Earliest instant for an ambiguous local time. Local times that fall in a
/// DST gap are moved forward by an hour.
fn local_to_utc(dt: &NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(dt)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*dt + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%dT%H:%M:%S"), tzid)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn from_ics_str(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "TENTATIVE" => EventStatus::Tentative,
            "CANCELLED" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

/// Recurrence data of a master event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Value of the RRULE property, e.g. `FREQ=WEEKLY;BYDAY=MO`
    pub rrule: String,
    /// Excluded instance starts
    pub exdates: Vec<EventTime>,
    /// Extra instance starts
    pub rdates: Vec<EventTime>,
}

/// An event as declared in the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDefinition {
    pub uid: String,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    /// DTSTART as written, needed to seed recurrence expansion
    pub start_time: EventTime,
    /// DTSTART pinned to an instant
    pub start: DateTime<Utc>,
    #[serde(with = "duration_seconds")]
    pub duration: Duration,
    pub recurrence: Option<Recurrence>,
    /// Set on instance overrides of a recurring event (RECURRENCE-ID)
    pub recurrence_id: Option<DateTime<Utc>>,
    pub status: EventStatus,
}

impl EventDefinition {
    pub fn new(uid: impl Into<String>, summary: impl Into<String>, start: DateTime<Utc>, duration: Duration) -> Self {
        EventDefinition {
            uid: uid.into(),
            summary: summary.into(),
            location: None,
            description: None,
            start_time: EventTime::DateTimeUtc(start),
            start,
            duration,
            recurrence: None,
            recurrence_id: None,
            status: EventStatus::Confirmed,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    pub fn is_all_day(&self) -> bool {
        self.start_time.is_all_day()
    }

    /// Nominal end: start + duration.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

impl fmt::Display for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::seconds)
    }
}
