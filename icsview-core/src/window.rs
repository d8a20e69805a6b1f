//! Half-open time windows.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{IcsViewError, IcsViewResult};

/// A half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> IcsViewResult<Self> {
        if end < start {
            return Err(IcsViewError::InvalidDate(format!(
                "Window end {} is before its start {}",
                end, start
            )));
        }
        Ok(Window { start, end })
    }

    /// The local day `date` in `tz`.
    pub fn day(date: NaiveDate, tz: Tz) -> IcsViewResult<Self> {
        let next = date
            .succ_opt()
            .ok_or_else(|| IcsViewError::InvalidDate(format!("No day after {}", date)))?;
        Window::new(local_midnight(date, tz)?, local_midnight(next, tz)?)
    }

    /// The local month containing `date` in `tz`.
    pub fn month(date: NaiveDate, tz: Tz) -> IcsViewResult<Self> {
        let first = first_of_month(date.year(), date.month())?;
        let next = add_months(first, 1)?;
        Window::new(local_midnight(first, tz)?, local_midnight(next, tz)?)
    }

    /// The local year containing `date` in `tz`.
    pub fn year(date: NaiveDate, tz: Tz) -> IcsViewResult<Self> {
        let first = first_of_month(date.year(), 1)?;
        let next = add_months(first, 12)?;
        Window::new(local_midnight(first, tz)?, local_midnight(next, tz)?)
    }

    /// From local midnight of the day containing `now` to `days` days later.
    pub fn next_n_days(now: DateTime<Utc>, days: u32, tz: Tz) -> IcsViewResult<Self> {
        let today = now.with_timezone(&tz).date_naive();
        let last = today
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| IcsViewError::InvalidDate(format!("{} days after {} is out of range", days, today)))?;
        Window::new(local_midnight(today, tz)?, local_midnight(last, tz)?)
    }

    /// True if `[start, end)` of an event overlaps this window.
    ///
    /// An event ending exactly at `self.start` does not overlap; neither does
    /// one starting exactly at `self.end`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        // Ends before (or as) the window starts
        if end <= self.start {
            return false;
        }

        // Ends within the window, possibly having started before it
        if end <= self.end {
            return true;
        }

        // Starts within the window and runs past its end
        start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Both edges moved by `months` calendar months, keeping their local
    /// wall-clock time in `tz`.
    pub fn shift_months(&self, months: i32, tz: Tz) -> IcsViewResult<Self> {
        Window::new(
            shift_local(self.start, months, tz)?,
            shift_local(self.end, months, tz)?,
        )
    }
}

fn shift_local(instant: DateTime<Utc>, months: i32, tz: Tz) -> IcsViewResult<DateTime<Utc>> {
    let local = instant.with_timezone(&tz).naive_local();
    let date = add_months(local.date(), months)?;
    let shifted = date.and_time(local.time());

    tz.from_local_datetime(&shifted)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(shifted + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| IcsViewError::InvalidDate(format!("{} does not exist in {}", shifted, tz)))
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

fn first_of_month(year: i32, month: u32) -> IcsViewResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| IcsViewError::InvalidDate(format!("{}-{:02} is not a valid month", year, month)))
}

pub(crate) fn add_months(date: NaiveDate, months: i32) -> IcsViewResult<NaiveDate> {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or_else(|| IcsViewError::InvalidDate(format!("{} shifted by {} months is out of range", date, months)))
}

/// Midnight at the start of `date` in `tz`, as an instant.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> IcsViewResult<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| IcsViewError::InvalidDate(date.to_string()))?;

    // Some zones skip midnight on DST change days; use the first instant of the day
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| IcsViewError::InvalidDate(format!("{} has no midnight in {}", date, tz)))
}
