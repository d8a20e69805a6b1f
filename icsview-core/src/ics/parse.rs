//! ICS feed parsing using the icalendar crate's parser.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use icalendar::parser::{Component, Property, read_calendar, unfold};

use crate::error::{IcsViewError, IcsViewResult};
use crate::event::{EventDefinition, EventStatus, EventTime, Recurrence};

/// A parsed calendar feed.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    /// `X-WR-CALNAME`, if the feed declares one
    pub name: Option<String>,
    /// Every VEVENT in the feed, cancelled ones included
    pub definitions: Vec<Arc<EventDefinition>>,
    /// Definitions that are not cancelled
    pub active: Arc<[Arc<EventDefinition>]>,
}

impl ParsedFeed {
    fn new(name: Option<String>, definitions: Vec<EventDefinition>) -> Self {
        let definitions: Vec<Arc<EventDefinition>> = definitions.into_iter().map(Arc::new).collect();
        let active = definitions
            .iter()
            .filter(|d| !d.is_cancelled())
            .cloned()
            .collect();

        ParsedFeed {
            name,
            definitions,
            active,
        }
    }
}

/// Parse a whole VCALENDAR document into event definitions.
///
/// Floating times and all-day dates are pinned to `tz`.
pub fn parse_feed(content: &str, tz: Tz) -> IcsViewResult<ParsedFeed> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| IcsViewError::IcsParse(e.to_string()))?;

    let name = calendar
        .properties
        .iter()
        .find(|p| p.name == "X-WR-CALNAME")
        .map(|p| p.val.to_string());

    let mut definitions = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .map(|vevent| parse_vevent(vevent, tz))
        .collect::<IcsViewResult<Vec<_>>>()?;

    fold_cancelled_instances(&mut definitions);

    Ok(ParsedFeed::new(name, definitions))
}

/// A cancelled instance override removes that instance from its master.
fn fold_cancelled_instances(definitions: &mut [EventDefinition]) {
    let cancelled: Vec<(String, DateTime<Utc>)> = definitions
        .iter()
        .filter(|d| d.is_cancelled())
        .filter_map(|d| d.recurrence_id.map(|rid| (d.uid.clone(), rid)))
        .collect();

    for (uid, rid) in cancelled {
        let master = definitions
            .iter_mut()
            .find(|d| d.uid == uid && d.recurrence_id.is_none());

        if let Some(recurrence) = master.and_then(|m| m.recurrence.as_mut()) {
            recurrence.exdates.push(EventTime::DateTimeUtc(rid));
        }
    }
}

/// Parse one VEVENT component.
fn parse_vevent(vevent: &Component, tz: Tz) -> IcsViewResult<EventDefinition> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .unwrap_or_default();
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| "(No title)".to_string());
    let location = vevent.find_prop("LOCATION").map(|p| p.val.to_string());
    let description = vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string());

    let start_time = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| IcsViewError::IcsParse(format!("Event '{}' has no DTSTART", uid)))
        .and_then(|p| parse_date_property(p, &uid))?;
    let start = pin(&start_time, tz, &uid)?;

    let duration = match vevent.find_prop("DTEND") {
        Some(p) => pin(&parse_date_property(p, &uid)?, tz, &uid)? - start,
        None => match vevent.find_prop("DURATION") {
            Some(p) => parse_duration(p.val.as_ref()).ok_or_else(|| {
                IcsViewError::IcsParse(format!("Event '{}' has an invalid DURATION", uid))
            })?,
            // RFC 5545 3.6.1: a DATE start without end lasts one day, a DATE-TIME start none
            None if start_time.is_all_day() => Duration::days(1),
            None => Duration::zero(),
        },
    };

    let status = vevent
        .find_prop("STATUS")
        .map(|p| EventStatus::from_ics_str(p.val.as_ref()))
        .unwrap_or(EventStatus::Confirmed);

    // Recurrence (RRULE, EXDATE, RDATE)
    let recurrence = vevent.find_prop("RRULE").map(|p| Recurrence {
        rrule: p.val.to_string(),
        exdates: date_list(vevent, "EXDATE"),
        rdates: date_list(vevent, "RDATE"),
    });

    let recurrence_id = match vevent.find_prop("RECURRENCE-ID") {
        Some(p) => Some(pin(&parse_date_property(p, &uid)?, tz, &uid)?),
        None => None,
    };

    Ok(EventDefinition {
        uid,
        summary,
        location,
        description,
        start_time,
        start,
        duration: duration.max(Duration::zero()),
        recurrence,
        recurrence_id,
        status,
    })
}

/// The single date value of DTSTART, DTEND or RECURRENCE-ID.
fn parse_date_property(prop: &Property<'_>, uid: &str) -> IcsViewResult<EventTime> {
    date_values(prop).into_iter().next().ok_or_else(|| {
        IcsViewError::IcsParse(format!(
            "Event '{}' has an invalid {} value '{}'",
            uid,
            prop.name.as_ref(),
            prop.val.as_ref()
        ))
    })
}

fn pin(time: &EventTime, tz: Tz, uid: &str) -> IcsViewResult<DateTime<Utc>> {
    time.to_utc(tz).ok_or_else(|| {
        IcsViewError::IcsParse(format!("Event '{}' has an unrepresentable time {}", uid, time))
    })
}

/// Parse a signed ISO 8601 duration (`PT1H30M`, `-P1D`, `+P1W`).
fn parse_duration(value: &str) -> Option<Duration> {
    let negative = value.starts_with('-');
    let unsigned = value.trim_start_matches(['-', '+']);

    let duration = iso8601::duration(unsigned).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let duration = Duration::from_std(std_duration).ok()?;

    Some(if negative { -duration } else { duration })
}

/// Collect every value of a multi-valued date property (EXDATE, RDATE).
fn date_list(vevent: &Component, name: &str) -> Vec<EventTime> {
    vevent
        .properties
        .iter()
        .filter(|p| p.name == name)
        .flat_map(date_values)
        .collect()
}

fn param<'a>(prop: &'a Property<'_>, key: &str) -> Option<&'a str> {
    prop.params
        .iter()
        .find(|p| p.key == key)?
        .val
        .as_ref()
        .map(|v| v.as_ref())
}

/// Values of a date property, e.g. `;TZID=Europe/Berlin:20240108T100000,20240115T100000`.
/// `VALUE=PERIOD` lists yield nothing.
fn date_values(prop: &Property<'_>) -> Vec<EventTime> {
    let tzid = param(prop, "TZID").map(|t| t.trim_matches('"'));
    let kind = param(prop, "VALUE");
    if kind == Some("PERIOD") {
        return Vec::new();
    }

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|value| date_value(value, tzid, kind == Some("DATE")))
        .collect()
}

fn date_value(value: &str, tzid: Option<&str>, is_date: bool) -> Option<EventTime> {
    if is_date || value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d").ok().map(EventTime::Date);
    }

    let (local, is_utc) = match value.strip_suffix('Z') {
        Some(local) => (local, true),
        None => (value, false),
    };
    let datetime = NaiveDateTime::parse_from_str(local, "%Y%m%dT%H%M%S").ok()?;

    Some(match tzid {
        _ if is_utc => EventTime::DateTimeUtc(datetime.and_utc()),
        Some(tzid) => EventTime::DateTimeZoned {
            datetime,
            tzid: tzid.to_string(),
        },
        None => EventTime::DateTimeFloating(datetime),
    })
}
