//! Colored terminal rendering for occurrences and month grids.

use std::collections::HashSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use icsview_core::grid::DAY_NAMES;
use icsview_core::{CalendarMonth, IcsViewResult, Occurrence, Window};
use owo_colors::OwoColorize;

/// Visible width of a rendered month grid.
pub const GRID_WIDTH: usize = 20;

pub trait Render {
    fn render(&self) -> String;
}

/// An occurrence as one line of an event list.
pub struct EventLine<'a> {
    pub occurrence: &'a Occurrence,
    pub tz: Tz,
}

impl Render for EventLine<'_> {
    fn render(&self) -> String {
        let o = self.occurrence;
        let time = if o.definition.is_all_day() {
            "all-day".to_string()
        } else {
            format!(
                "{}-{}",
                o.start.with_timezone(&self.tz).format("%H:%M"),
                o.end.with_timezone(&self.tz).format("%H:%M")
            )
        };

        let mut line = format!("  {:>11}  {}", time, o.definition.summary);
        if let Some(location) = &o.definition.location {
            line = format!("{} {}", line, format!("@ {}", location).dimmed());
        }

        if o.in_progress {
            format!("{} {}", line.green(), "(in progress)".yellow().bold())
        } else if o.past {
            line.dimmed().to_string()
        } else {
            line
        }
    }
}

/// "Today", "Tomorrow", "Yesterday" or e.g. "Wed Feb 25 2026".
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d %Y").to_string(),
    }
}

/// Occurrences grouped under a label for the local day they start on.
pub fn event_list(occurrences: &[Occurrence], tz: Tz, today: NaiveDate) -> String {
    if occurrences.is_empty() {
        return "No events found".dimmed().to_string();
    }

    let mut lines = Vec::new();
    let mut current: Option<NaiveDate> = None;

    for o in occurrences {
        let date = o.start.with_timezone(&tz).date_naive();
        if current != Some(date) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(day_label(date, today).bold().to_string());
            current = Some(date);
        }
        lines.push(EventLine { occurrence: o, tz }.render());
    }

    lines.join("\n")
}

/// A month grid with busy days in bold, past days dimmed and today reversed.
pub struct MonthGrid<'a> {
    month: &'a CalendarMonth,
    busy: HashSet<u32>,
    today: NaiveDate,
}

impl<'a> MonthGrid<'a> {
    pub fn new(month: &'a CalendarMonth, occurrences: &[Occurrence], tz: Tz, today: NaiveDate) -> IcsViewResult<Self> {
        let mut busy = HashSet::new();
        for day in &month.days {
            let Some(date) = day.to_naive_date() else {
                continue;
            };
            let span = Window::day(date, tz)?;
            if occurrences.iter().any(|o| o.overlaps(&span)) {
                busy.insert(day.date);
            }
        }

        Ok(MonthGrid { month, busy, today })
    }

    /// Lines of exactly [`GRID_WIDTH`] visible characters.
    pub fn lines(&self) -> Vec<String> {
        let title = format!("{} {}", self.month.name(), self.month.year);
        let headings: Vec<&str> = DAY_NAMES.iter().map(|d| &d[..2]).collect();

        let mut lines = vec![
            format!("{:^width$}", title, width = GRID_WIDTH).bold().to_string(),
            headings.join(" ").dimmed().to_string(),
        ];

        for week in &self.month.rows {
            let cells: Vec<String> = week
                .iter()
                .map(|slot| match slot {
                    Some(day) => self.cell(day.date),
                    None => "  ".to_string(),
                })
                .collect();
            lines.push(cells.join(" "));
        }

        lines
    }

    fn cell(&self, date: u32) -> String {
        let text = format!("{:>2}", date);
        let this = NaiveDate::from_ymd_opt(self.month.year, self.month.month, date);

        if this == Some(self.today) {
            text.reversed().to_string()
        } else if self.busy.contains(&date) {
            text.bold().underline().to_string()
        } else if this.is_some_and(|d| d < self.today) {
            text.dimmed().to_string()
        } else {
            text
        }
    }
}

impl Render for MonthGrid<'_> {
    fn render(&self) -> String {
        self.lines().join("\n")
    }
}

/// Lay grids out in columns, `per_row` grids across.
pub fn side_by_side(grids: &[Vec<String>], per_row: usize) -> String {
    let blank = " ".repeat(GRID_WIDTH);
    let mut out = Vec::new();

    for chunk in grids.chunks(per_row.max(1)) {
        let height = chunk.iter().map(Vec::len).max().unwrap_or(0);
        for i in 0..height {
            let row: Vec<&str> = chunk
                .iter()
                .map(|g| g.get(i).map(String::as_str).unwrap_or(&blank))
                .collect();
            out.push(row.join("   ").trim_end().to_string());
        }
        out.push(String::new());
    }

    out.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use icsview_core::{EventDefinition, resolve};
    use std::sync::Arc;

    /// Drop ANSI escape sequences.
    fn plain(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn january(now: DateTime<Utc>) -> Vec<Occurrence> {
        let mut talk = EventDefinition::new("talk", "Antenna talk", utc(2024, 1, 10, 18, 0), Duration::hours(2));
        talk.location = Some("Club hall".into());
        let defs = vec![
            Arc::new(EventDefinition::new("net", "Weekly net", utc(2024, 1, 3, 19, 0), Duration::hours(1))),
            Arc::new(talk),
        ];
        let window = Window::month(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), Tz::UTC).unwrap();
        resolve(&defs, &window, now, Tz::UTC).unwrap()
    }

    #[test]
    fn event_list_groups_by_day() {
        let now = utc(2024, 1, 10, 19, 0);
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        let text = plain(&event_list(&january(now), Tz::UTC, today));

        assert_eq!(
            text,
            "Wed Jan 3 2024\n  19:00-20:00  Weekly net\n\nToday\n  18:00-20:00  Antenna talk @ Club hall (in progress)"
        );
    }

    #[test]
    fn empty_list() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        assert_eq!(plain(&event_list(&[], Tz::UTC, today)), "No events found");
    }

    #[test]
    fn grid_lines_have_fixed_width() {
        let now = utc(2024, 1, 10, 9, 0);
        let today = now.date_naive();
        let month = CalendarMonth::new(2024, 1, true).unwrap();
        let occurrences = january(now);

        let grid = MonthGrid::new(&month, &occurrences, Tz::UTC, today).unwrap();
        let lines: Vec<String> = grid.lines().iter().map(|l| plain(l)).collect();

        assert_eq!(lines[0].trim(), "January 2024");
        assert_eq!(lines[1], "Su Mo Tu We Th Fr Sa");
        assert_eq!(lines[2], "    1  2  3  4  5  6");
        assert!(lines.iter().all(|l| l.chars().count() == GRID_WIDTH));
        assert_eq!(grid.busy, HashSet::from([3, 10]));
    }

    #[test]
    fn grids_side_by_side() {
        let a = vec!["a".repeat(GRID_WIDTH), "b".repeat(GRID_WIDTH)];
        let b = vec!["c".repeat(GRID_WIDTH)];

        let text = side_by_side(&[a, b], 2);

        assert_eq!(
            text,
            format!("{}   {}\n{}", "a".repeat(20), "c".repeat(20), "b".repeat(20))
        );
    }

    #[test]
    fn relative_labels() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        assert_eq!(day_label(today, today), "Today");
        assert_eq!(day_label(today.succ_opt().unwrap(), today), "Tomorrow");
        assert_eq!(day_label(today.pred_opt().unwrap(), today), "Yesterday");
    }
}
