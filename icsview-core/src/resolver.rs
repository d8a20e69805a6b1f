//! Event window resolution.
//!
//! Turns event definitions into the concrete occurrences that overlap a
//! window, tagged relative to "now" and sorted by start then end.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::IcsViewResult;
use crate::event::EventDefinition;
use crate::recurrence::expand_starts;
use crate::window::Window;

/// Where an occurrence sits relative to the instant it was resolved at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Past,
    InProgress,
    Upcoming,
}

/// A concrete instance of an event definition within a window.
#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    #[serde(rename = "event")]
    pub definition: Arc<EventDefinition>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `now` lies within `[start, end]`, both ends inclusive
    pub in_progress: bool,
    /// `now` is after `end`
    pub past: bool,
}

impl Occurrence {
    fn new(definition: &Arc<EventDefinition>, start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let end = start + definition.duration;
        Occurrence {
            definition: Arc::clone(definition),
            start,
            end,
            in_progress: now >= start && now <= end,
            past: now > end,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.in_progress {
            Phase::InProgress
        } else if self.past {
            Phase::Past
        } else {
            Phase::Upcoming
        }
    }

    /// True if this occurrence overlaps `window` (same rule as resolution).
    pub fn overlaps(&self, window: &Window) -> bool {
        window.overlaps(self.start, self.end)
    }
}

/// Resolve `definitions` into the occurrences overlapping `window`.
///
/// Cancelled definitions are expected to be filtered out by the caller.
/// Recurring definitions are expanded forward until a start passes
/// `window.end`, keeping only starts late enough to reach the window; instances that have an override definition (same UID with a
/// RECURRENCE-ID) are left to the override. Floating and all-day times are
/// read in `tz`.
pub fn resolve(
    definitions: &[Arc<EventDefinition>],
    window: &Window,
    now: DateTime<Utc>,
    tz: Tz,
) -> IcsViewResult<Vec<Occurrence>> {
    let overridden: HashSet<(&str, DateTime<Utc>)> = definitions
        .iter()
        .filter_map(|d| d.recurrence_id.map(|rid| (d.uid.as_str(), rid)))
        .collect();

    let mut occurrences = Vec::new();

    for definition in definitions {
        if definition.is_recurring() {
            let from = window.start - definition.duration;
            for start in expand_starts(definition, from, window.end, tz)? {
                if overridden.contains(&(definition.uid.as_str(), start)) {
                    continue;
                }
                let occurrence = Occurrence::new(definition, start, now);
                if occurrence.overlaps(window) {
                    occurrences.push(occurrence);
                }
            }
        } else {
            let occurrence = Occurrence::new(definition, definition.start, now);
            if occurrence.overlaps(window) {
                occurrences.push(occurrence);
            }
        }
    }

    // Stable: equal (start, end) pairs keep discovery order
    occurrences.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    tracing::debug!(window = %window, count = occurrences.len(), "resolved occurrences");
    Ok(occurrences)
}
