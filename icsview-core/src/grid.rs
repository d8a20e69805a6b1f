//! Calendar grid arithmetic: month lengths, day of week, and week rows.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{IcsViewError, IcsViewResult};

/// Sakamoto's month offsets.
const MONTH_TABLE: [u32; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];

/// Lengths of months in days for a common year.
const MONTH_LEN: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    MONTH_LEN[(month - 1) as usize] + u32::from(month == 2 && is_leap_year(year))
}

/// Day of the week, 0 = Sunday.
///
/// <https://en.wikipedia.org/wiki/Determination_of_the_day_of_the_week#Sakamoto's_methods>
pub fn day_of_week(year: i32, month: u32, day: u32) -> u32 {
    let y = if month < 3 { year - 1 } else { year };
    let sum = y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
        + MONTH_TABLE[(month - 1) as usize] as i32
        + day as i32;
    sum.rem_euclid(7) as u32
}

/// One day of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub year: i32,
    pub month: u32,
    pub date: u32,
    /// 0 = Sunday
    pub weekday: u32,
}

impl CalendarDay {
    pub fn name(&self) -> &'static str {
        DAY_NAMES[self.weekday as usize]
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.date)
    }
}

/// A row of the grid, Sunday first. `None` slots are padding.
pub type Week = [Option<CalendarDay>; 7];

/// A calendar month laid out in week rows.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    pub rows: Vec<Week>,
}

impl CalendarMonth {
    /// Lay out `month` (1-12) of `year` (after 1752).
    ///
    /// With `fold`, the trailing partial week is moved into the padding of the
    /// first week when none of its days would land on a day of the first week.
    pub fn new(year: i32, month: u32, fold: bool) -> IcsViewResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(IcsViewError::InvalidDate(format!("Month {} is not in 1-12", month)));
        }
        if year <= 1752 {
            return Err(IcsViewError::InvalidDate(format!(
                "Year {} predates the Gregorian calendar in this grid",
                year
            )));
        }

        let days_in_month = days_in_month(year, month);
        let first_day = day_of_week(year, month, 1) as usize;

        let mut days = Vec::with_capacity(days_in_month as usize);
        let mut rows: Vec<Week> = Vec::new();
        let mut week: Week = [None; 7];
        let mut wday = first_day;

        for date in 1..=days_in_month {
            let day = CalendarDay {
                year,
                month,
                date,
                weekday: wday as u32,
            };
            days.push(day);
            week[wday] = Some(day);

            wday = (wday + 1) % 7;
            if wday == 0 {
                rows.push(week);
                week = [None; 7];
            }
        }

        if wday != 0 {
            if fold && wday <= first_day {
                // Trailing days fit in the leading padding
                rows[0][..wday].copy_from_slice(&week[..wday]);
            } else {
                rows.push(week);
            }
        }

        Ok(CalendarMonth {
            year,
            month,
            days,
            rows,
        })
    }

    pub fn name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// The day with date `date` (1-based), if the month has it.
    pub fn day(&self, date: u32) -> Option<&CalendarDay> {
        date.checked_sub(1).and_then(|i| self.days.get(i as usize))
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}, {}", self.name(), self.year)?;

        let headings: Vec<&str> = DAY_NAMES.iter().map(|d| &d[..2]).collect();
        write!(f, "{}", headings.join(" "))?;

        for week in &self.rows {
            let cells: Vec<String> = week
                .iter()
                .map(|slot| match slot {
                    Some(day) => day.to_string(),
                    None => "--".to_string(),
                })
                .collect();
            write!(f, "\n{}", cells.join(" "))?;
        }

        Ok(())
    }
}
