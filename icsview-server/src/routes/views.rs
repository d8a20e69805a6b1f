//! Server-rendered year, month and day pages.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use icsview_core::grid::{DAY_NAMES, MONTH_NAMES};
use icsview_core::{CalendarDay, CalendarMonth, IcsViewError, IcsViewResult, Occurrence, Window};
use url::form_urlencoded;

use crate::html::{Element, Node, Table};
use crate::routes::{DisplayMode, ViewArgs, status_for};
use crate::state::AppState;

const STYLESHEET: &str = include_str!("../../assets/calendar.css");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(calendar_page))
        .route("/calendar.css", get(stylesheet))
}

async fn stylesheet() -> ([(axum::http::HeaderName, &'static str); 1], &'static str) {
    ([(axum::http::header::CONTENT_TYPE, "text/css")], STYLESHEET)
}

/// GET / - Render the view selected by the query arguments
async fn calendar_page(
    State(state): State<AppState>,
    Query(args): Query<ViewArgs>,
) -> (StatusCode, Html<String>) {
    let now = Utc::now();
    let tz = state.tz();
    let ctx = PageContext::new(&args, now, tz);

    match load_view(&state, &ctx).await {
        Ok((title, body)) => (StatusCode::OK, Html(page(&title, body))),
        Err(e) => {
            tracing::warn!(error = %e, display = args.display.as_str(), "failed to render calendar");
            (status_for(&e), Html(page("Calendar", error_block(&e))))
        }
    }
}

async fn load_view(state: &AppState, ctx: &PageContext<'_>) -> IcsViewResult<(String, Element)> {
    if ctx.args.reload {
        tracing::debug!("reload requested, dropping cached feed");
        state.loader().invalidate().await;
    }

    let window = ctx.args.display.window(ctx.date, ctx.tz)?;
    let occurrences = state.viewer(window).events(ctx.now).await?;
    let title = state
        .loader()
        .feed()
        .await?
        .name
        .clone()
        .unwrap_or_else(|| "Calendar".to_string());

    let body = match ctx.args.display {
        DisplayMode::Year => year_view(ctx, &window, &occurrences)?,
        DisplayMode::Month => month_view(ctx, &window, &occurrences)?,
        DisplayMode::Day => day_view(ctx, &occurrences)?,
    };
    Ok((title, body))
}

/// Everything a view needs besides the occurrences.
pub struct PageContext<'a> {
    pub args: &'a ViewArgs,
    /// Date the view is centred on
    pub date: NaiveDate,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
    pub tz: Tz,
}

impl<'a> PageContext<'a> {
    pub fn new(args: &'a ViewArgs, now: DateTime<Utc>, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        PageContext {
            args,
            date: args.date.unwrap_or(today),
            today,
            now,
            tz,
        }
    }

    /// Link to another view, keeping `target` and, unless asked otherwise, `embed`.
    fn href(&self, display: DisplayMode, date: NaiveDate, embed: bool) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("display", display.as_str());
        query.append_pair("date", &date.format("%Y-%m-%d").to_string());
        if embed {
            query.append_pair("embed", "true");
        }
        if let Some(target) = &self.args.target {
            query.append_pair("target", target);
        }
        format!("?{}", query.finish())
    }
}

pub fn page(title: &str, body: impl Into<Node>) -> String {
    let head = Element::new("head")
        .child(Element::new("meta").attr("charset", "utf-8"))
        .child(Element::new("title").child(title))
        .child(Element::new("link").attr("rel", "stylesheet").attr("href", "/calendar.css"));

    let html = Element::new("html")
        .attr("lang", "en")
        .child(head)
        .child(Element::new("body").child(body));

    format!("<!DOCTYPE html>\n{}", html)
}

/// Degraded output for a failed load: the message, not a blank page.
pub fn error_block(err: &IcsViewError) -> Element {
    Element::div()
        .class("calendar")
        .child(Element::new("pre").class("calendar_error").child(err.to_string()))
}

fn nav_link(href: String, label: &str) -> Element {
    Element::link(href, None).class("calendar_nav").child(label)
}

fn format_start(o: &Occurrence, tz: Tz) -> String {
    let local = o.start.with_timezone(&tz);
    if o.definition.is_all_day() {
        local.format("%a %-d %b %Y").to_string()
    } else {
        local.format("%a %-d %b %Y %H:%M").to_string()
    }
}

fn format_end(o: &Occurrence, tz: Tz) -> String {
    if o.definition.is_all_day() {
        // DTEND of an all-day event is the following midnight
        let last = (o.end - Duration::days(1)).max(o.start);
        return last.with_timezone(&tz).format("%a %-d %b %Y").to_string();
    }

    let start = o.start.with_timezone(&tz);
    let end = o.end.with_timezone(&tz);
    if start.date_naive() == end.date_naive() {
        end.format("%H:%M").to_string()
    } else {
        end.format("%a %-d %b %Y %H:%M").to_string()
    }
}

/// One event entry: a link to the day of the event with times, summary and
/// location.
pub fn event_entry(ctx: &PageContext<'_>, o: &Occurrence, target: Option<&str>) -> Element {
    let day = o.start.with_timezone(&ctx.tz).date_naive();
    let mut link = Element::link(ctx.href(DisplayMode::Day, day, false), target).class("calendar_event");

    if o.in_progress {
        link.add_class("calendar_event_in_progress");
    } else if o.past {
        link.add_class("calendar_event_past");
    }

    let mut time = Element::div()
        .class("calendar_event_time")
        .child(Element::span().class("calendar_event_start").child(format_start(o, ctx.tz)))
        .child(Element::span().class("calendar_event_time_sep").child(" - "))
        .child(Element::span().class("calendar_event_end").child(format_end(o, ctx.tz)));

    if o.in_progress {
        time.append_child(" ");
        time.append_child(
            Element::span()
                .class("calendar_event_in_progress_span")
                .child("In Progress"),
        );
    }

    let summary = Element::div().child(
        Element::span()
            .class("calendar_event_summary")
            .child(o.definition.summary.as_str()),
    );
    let location = Element::div()
        .class("calendar_event_location")
        .child(o.definition.location.clone().unwrap_or_default());

    link.child(time).child(summary).child(location)
}

fn event_list(ctx: &PageContext<'_>, occurrences: &[Occurrence], target: Option<&str>) -> Element {
    let mut list = Element::div().class("calendar_events");
    if occurrences.is_empty() {
        list.append_child(Element::div().class("calendar_no_events").child("No events"));
    }
    for o in occurrences {
        list.append_child(event_entry(ctx, o, target));
    }
    list
}

/// Grid cell for a day: a link to the day view when the day has events,
/// otherwise an inert label. Days before today and today itself are marked.
fn day_cell(ctx: &PageContext<'_>, day: &CalendarDay, occurrences: &[Occurrence]) -> IcsViewResult<Element> {
    let date = day
        .to_naive_date()
        .ok_or_else(|| IcsViewError::InvalidDate(format!("{}-{}-{}", day.year, day.month, day.date)))?;
    let span = Window::day(date, ctx.tz)?;
    let has_events = occurrences.iter().any(|o| o.overlaps(&span));

    let mut cell = if has_events {
        Element::link(ctx.href(DisplayMode::Day, date, ctx.args.embed), None)
    } else {
        Element::span().class("calendar_day_disabled")
    };
    cell.add_class("calendar_day");
    cell.append_child(day.date.to_string());

    if date < ctx.today {
        cell.add_class("calendar_event_in_past");
    } else if date == ctx.today {
        cell.add_class("calendar_event_in_progress");
    }
    if ctx.args.display == DisplayMode::Day && date == ctx.date {
        cell.add_class("calendar_day_selected");
    }

    Ok(cell)
}

pub fn month_table(ctx: &PageContext<'_>, month: &CalendarMonth, occurrences: &[Occurrence]) -> IcsViewResult<Element> {
    let mut table = Table::new(DAY_NAMES.iter().map(|name| &name[..3])).class("calendar_table");

    for week in &month.rows {
        let cells = week
            .iter()
            .map(|slot| match slot {
                Some(day) => day_cell(ctx, day, occurrences),
                None => Ok(Element::span()),
            })
            .collect::<IcsViewResult<Vec<_>>>()?;
        table.append_row(cells);
    }

    Ok(table.into_element())
}

fn range(ctx: &PageContext<'_>, prev: Option<String>, text: Vec<Node>, next: Option<String>) -> Element {
    let mut range = Element::div().class("calendar_range");
    if let Some(href) = prev {
        range.append_child(nav_link(href, "<"));
    }
    range.append_child(Element::div().class("calendar_range_text").children(text));
    if let Some(href) = next {
        range.append_child(nav_link(href, ">"));
    }
    if ctx.args.embed {
        range.add_class("calendar_embedded");
    }
    range
}

fn window_text(window: &Window, tz: Tz) -> Vec<Node> {
    let fmt = |t: DateTime<Utc>| t.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string();
    vec![
        "Events between ".into(),
        fmt(window.start).into(),
        " and ".into(),
        fmt(window.end).into(),
    ]
}

/// Twelve folded month grids and every event of the year.
pub fn year_view(ctx: &PageContext<'_>, window: &Window, occurrences: &[Occurrence]) -> IcsViewResult<Element> {
    let year = ctx.date.year();
    let (prev, next) = if ctx.args.embed {
        (None, None)
    } else {
        (
            Some(ctx.href(DisplayMode::Year, shift_year(ctx.date, -1)?, false)),
            Some(ctx.href(DisplayMode::Year, shift_year(ctx.date, 1)?, false)),
        )
    };

    let mut picker = Element::div().class("calendar_picker");
    for month in 1..=12 {
        let grid = CalendarMonth::new(year, month, true)?;
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| IcsViewError::InvalidDate(format!("{}-{}", year, month)))?;
        let heading = Element::link(ctx.href(DisplayMode::Month, first, ctx.args.embed), None)
            .class("calendar_month_name")
            .child(MONTH_NAMES[(month - 1) as usize]);

        picker.append_child(
            Element::div()
                .class("calendar_month")
                .child(heading)
                .child(month_table(ctx, &grid, occurrences)?),
        );
    }

    Ok(Element::div()
        .class("calendar")
        .child(range(ctx, prev, window_text(window, ctx.tz), next))
        .child(picker)
        .child(event_list(ctx, occurrences, ctx.args.target.as_deref())))
}

/// One month grid and its events. Embedded, it drops navigation and opens
/// events in a new tab.
pub fn month_view(ctx: &PageContext<'_>, window: &Window, occurrences: &[Occurrence]) -> IcsViewResult<Element> {
    let grid = CalendarMonth::new(ctx.date.year(), ctx.date.month(), true)?;

    let mut calendar = Element::div().class("calendar");
    let (prev, next) = if ctx.args.embed {
        (None, None)
    } else {
        (
            Some(ctx.href(DisplayMode::Month, shift_month(ctx.date, -1)?, false)),
            Some(ctx.href(DisplayMode::Month, shift_month(ctx.date, 1)?, false)),
        )
    };
    calendar.append_child(range(ctx, prev, window_text(window, ctx.tz), next));

    if !ctx.args.embed {
        calendar.append_child(
            Element::div()
                .class("calendar_navigation")
                .child(nav_link(ctx.href(DisplayMode::Year, ctx.date, false), "Back to year")),
        );
    }

    let title = Element::div()
        .class("calendar_month_name")
        .child(format!("{} {}", grid.name(), grid.year));
    calendar.append_child(
        Element::div()
            .class("calendar_picker")
            .child(title)
            .child(month_table(ctx, &grid, occurrences)?),
    );

    let target = if ctx.args.embed {
        Some("_blank")
    } else {
        ctx.args.target.as_deref()
    };
    calendar.append_child(event_list(ctx, occurrences, target));

    Ok(calendar)
}

/// The month grid with the events of a single day. `occurrences` covers the
/// whole month.
pub fn day_view(ctx: &PageContext<'_>, occurrences: &[Occurrence]) -> IcsViewResult<Element> {
    let grid = CalendarMonth::new(ctx.date.year(), ctx.date.month(), true)?;
    let day = Window::day(ctx.date, ctx.tz)?;
    let on_day: Vec<Occurrence> = occurrences.iter().filter(|o| o.overlaps(&day)).cloned().collect();

    let prev = ctx
        .date
        .pred_opt()
        .map(|d| ctx.href(DisplayMode::Day, d, ctx.args.embed));
    let next = ctx
        .date
        .succ_opt()
        .map(|d| ctx.href(DisplayMode::Day, d, ctx.args.embed));
    let text = vec![
        Node::from("Events occurring on "),
        Node::from(ctx.date.format("%A %-d %B %Y").to_string()),
    ];

    let navigation = Element::div()
        .class("calendar_navigation")
        .child(nav_link(ctx.href(DisplayMode::Month, ctx.date, ctx.args.embed), "Back to month"))
        .child(nav_link(ctx.href(DisplayMode::Year, ctx.date, ctx.args.embed), "Back to year"));

    Ok(Element::div()
        .class("calendar")
        .child(range(ctx, prev, text, next))
        .child(navigation)
        .child(
            Element::div()
                .class("calendar_picker")
                .child(month_table(ctx, &grid, occurrences)?),
        )
        .child(event_list(ctx, &on_day, ctx.args.target.as_deref())))
}

fn shift_month(date: NaiveDate, months: i32) -> IcsViewResult<NaiveDate> {
    let first = date.with_day(1).unwrap_or(date);
    let shifted = if months >= 0 {
        first.checked_add_months(chrono::Months::new(months.unsigned_abs()))
    } else {
        first.checked_sub_months(chrono::Months::new(months.unsigned_abs()))
    };
    shifted.ok_or_else(|| IcsViewError::InvalidDate(format!("{} shifted by {} months", date, months)))
}

fn shift_year(date: NaiveDate, years: i32) -> IcsViewResult<NaiveDate> {
    shift_month(date, years * 12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use icsview_core::{EventDefinition, resolve};
    use std::sync::Arc;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn occurrences(window: &Window, now: DateTime<Utc>) -> Vec<Occurrence> {
        let mut talk = EventDefinition::new("talk", "Antenna talk", utc(2024, 1, 10, 18, 0), Duration::hours(2));
        talk.location = Some("Club hall".into());
        let defs = vec![
            Arc::new(EventDefinition::new("net", "Weekly net", utc(2024, 1, 3, 19, 0), Duration::hours(1))),
            Arc::new(talk),
            Arc::new(EventDefinition::new("dinner", "Dinner <& drinks>", utc(2024, 1, 20, 18, 0), Duration::hours(3))),
        ];
        resolve(&defs, window, now, Tz::UTC).unwrap()
    }

    fn args(display: DisplayMode, embed: bool) -> ViewArgs {
        ViewArgs {
            display,
            date: NaiveDate::from_ymd_opt(2024, 1, 10),
            embed,
            target: None,
            reload: false,
        }
    }

    #[test]
    fn event_entry_classes_and_progress() {
        let now = utc(2024, 1, 10, 19, 0);
        let args = args(DisplayMode::Month, false);
        let ctx = PageContext::new(&args, now, Tz::UTC);
        let window = DisplayMode::Month.window(ctx.date, Tz::UTC).unwrap();
        let occ = occurrences(&window, now);

        let past = event_entry(&ctx, &occ[0], None);
        let current = event_entry(&ctx, &occ[1], None);
        let upcoming = event_entry(&ctx, &occ[2], None);

        assert!(past.has_class("calendar_event_past"));
        assert!(current.has_class("calendar_event_in_progress"));
        assert!(!upcoming.has_class("calendar_event_past") && !upcoming.has_class("calendar_event_in_progress"));

        assert_eq!(current.find_by_class("calendar_event_in_progress_span").len(), 1);
        assert_eq!(current.find_by_class("calendar_event_location")[0].text_content(), "Club hall");
        assert_eq!(
            current.text_content(),
            "Wed 10 Jan 2024 18:00 - 20:00 In ProgressAntenna talkClub hall"
        );
        assert_eq!(current.get_attr("href"), Some("?display=day&date=2024-01-10"));
        assert!(upcoming.to_string().contains("Dinner &lt;&amp; drinks&gt;"));
    }

    #[test]
    fn month_view_grid_marks_days() {
        let now = utc(2024, 1, 10, 9, 0);
        let args = args(DisplayMode::Month, false);
        let ctx = PageContext::new(&args, now, Tz::UTC);
        let window = DisplayMode::Month.window(ctx.date, Tz::UTC).unwrap();
        let occ = occurrences(&window, now);

        let view = month_view(&ctx, &window, &occ).unwrap();

        let linked: Vec<String> = view
            .find_by_class("calendar_day")
            .iter()
            .filter(|c| c.tag() == "a")
            .map(|c| c.text_content())
            .collect();
        assert_eq!(linked, vec!["3", "10", "20"]);

        let today = view.find_by_class("calendar_event_in_progress");
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].text_content(), "10");
        assert_eq!(view.find_by_class("calendar_event_in_past").len(), 9);

        assert_eq!(view.find_by_class("calendar_navigation").len(), 1);
        assert_eq!(view.find_by_class("calendar_event").len(), 3);
    }

    #[test]
    fn embedded_month_hides_navigation_and_opens_new_tab() {
        let now = utc(2024, 1, 10, 9, 0);
        let args = args(DisplayMode::Month, true);
        let ctx = PageContext::new(&args, now, Tz::UTC);
        let window = DisplayMode::Month.window(ctx.date, Tz::UTC).unwrap();
        let occ = occurrences(&window, now);

        let view = month_view(&ctx, &window, &occ).unwrap();

        assert!(view.find_by_class("calendar_navigation").is_empty());
        assert!(view.find_by_class("calendar_nav").is_empty());
        assert!(
            view.find_by_class("calendar_event")
                .iter()
                .all(|e| e.get_attr("target") == Some("_blank"))
        );
    }

    #[test]
    fn day_view_lists_only_that_day() {
        let now = utc(2024, 1, 1, 0, 0);
        let args = args(DisplayMode::Day, false);
        let ctx = PageContext::new(&args, now, Tz::UTC);
        let window = DisplayMode::Day.window(ctx.date, Tz::UTC).unwrap();
        let occ = occurrences(&window, now);

        let view = day_view(&ctx, &occ).unwrap();

        let events = view.find_by_class("calendar_event_summary");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text_content(), "Antenna talk");
        assert_eq!(view.find_by_class("calendar_day_selected")[0].text_content(), "10");
        assert!(view.to_string().contains("?display=day&amp;date=2024-01-09"));
        assert!(view.to_string().contains("?display=day&amp;date=2024-01-11"));
    }

    #[test]
    fn year_view_has_twelve_months() {
        let now = utc(2024, 6, 1, 0, 0);
        let args = args(DisplayMode::Year, false);
        let ctx = PageContext::new(&args, now, Tz::UTC);
        let window = DisplayMode::Year.window(ctx.date, Tz::UTC).unwrap();
        let occ = occurrences(&window, now);

        let view = year_view(&ctx, &window, &occ).unwrap();

        assert_eq!(view.find_by_class("calendar_month").len(), 12);
        assert_eq!(view.find_by_class("calendar_table").len(), 12);
        assert_eq!(view.find_by_class("calendar_event_past").len(), 3);
        assert!(view.to_string().contains("?display=year&amp;date=2023-01-01"));
    }

    #[test]
    fn empty_list_and_error_block() {
        let now = utc(2024, 1, 10, 9, 0);
        let args = args(DisplayMode::Month, false);
        let ctx = PageContext::new(&args, now, Tz::UTC);

        assert_eq!(event_list(&ctx, &[], None).text_content(), "No events");

        let err = error_block(&IcsViewError::Fetch("HTTP 404 Not Found".into()));
        assert_eq!(
            err.to_string(),
            "<div class=\"calendar\"><pre class=\"calendar_error\">Failed to fetch calendar feed: HTTP 404 Not Found</pre></div>"
        );
    }

    #[test]
    fn links_keep_target() {
        let mut args = args(DisplayMode::Month, true);
        args.target = Some("cal frame".into());
        let ctx = PageContext::new(&args, utc(2024, 1, 10, 9, 0), Tz::UTC);

        assert_eq!(
            ctx.href(DisplayMode::Day, ctx.date, true),
            "?display=day&date=2024-01-10&embed=true&target=cal+frame"
        );
    }
}
