//! RRULE expansion for recurring events.
//!
//! Expansion walks the rule forward from the first occurrence and stops at the
//! first start past the requested bound, so unbounded rules terminate.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{IcsViewError, IcsViewResult};
use crate::event::{EventDefinition, EventTime, Recurrence};

/// Build an iCalendar-format rule set string for the rrule crate parser.
fn build_rrule_string(definition: &EventDefinition, recurrence: &Recurrence, tz: Tz) -> String {
    let zone = definition.start_time.zone(tz);
    let mut lines = vec![
        format!("DTSTART{}", definition.start_time.to_ics_property(tz)),
        format!("RRULE:{}", pin_until(&recurrence.rrule, zone)),
    ];

    lines.extend(
        recurrence
            .exdates
            .iter()
            .map(|t| format!("EXDATE{}", t.to_ics_property(tz))),
    );
    lines.extend(
        recurrence
            .rdates
            .iter()
            .map(|t| format!("RDATE{}", t.to_ics_property(tz))),
    );

    lines.join("\n")
}

/// Rewrite a date or floating `UNTIL` as the UTC instant it means in `zone`.
///
/// All-day and floating starts are pinned to a zone before expansion, and a
/// zoned DTSTART only pairs with a UTC `UNTIL`. A date `UNTIL` covers the
/// whole local day.
fn pin_until(rrule: &str, zone: Tz) -> String {
    rrule
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") && !value.ends_with(['Z', 'z']) => {
                match local_until(value, zone) {
                    Some(until) => format!("{}={}", key, until.format("%Y%m%dT%H%M%SZ")),
                    None => part.to_string(),
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn local_until(value: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let local = match NaiveDate::parse_from_str(value, "%Y%m%d") {
        Ok(date) => date.and_hms_opt(23, 59, 59)?,
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?,
    };
    EventTime::DateTimeFloating(local).to_utc(zone)
}

/// Parse the recurrence of `definition`, if it has one.
pub fn rule_set(definition: &EventDefinition, tz: Tz) -> IcsViewResult<Option<RRuleSet>> {
    let Some(recurrence) = &definition.recurrence else {
        return Ok(None);
    };

    let rrule_str = build_rrule_string(definition, recurrence, tz);

    rrule_str.parse::<RRuleSet>().map(Some).map_err(|e| {
        IcsViewError::InvalidRule(format!(
            "Failed to parse RRULE for event '{}': {}",
            definition.uid, e
        ))
    })
}

/// Starts of a recurring event in `[from, until]`, in order.
///
/// Returns an empty list for non-recurring definitions.
pub fn expand_starts(
    definition: &EventDefinition,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    tz: Tz,
) -> IcsViewResult<Vec<DateTime<Utc>>> {
    let Some(set) = rule_set(definition, tz)? else {
        return Ok(Vec::new());
    };

    let mut starts = Vec::new();
    for occurrence in &set {
        let start = occurrence.with_timezone(&Utc);
        if start > until {
            break;
        }
        if start >= from {
            starts.push(start);
        }
    }

    tracing::trace!(uid = %definition.uid, count = starts.len(), "expanded recurrence");
    Ok(starts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn daily(start: DateTime<Utc>, rrule: &str) -> EventDefinition {
        let mut def = EventDefinition::new("daily", "Daily check-in", start, Duration::minutes(30));
        def.recurrence = Some(Recurrence {
            rrule: rrule.to_string(),
            exdates: vec![],
            rdates: vec![],
        });
        def
    }

    #[test]
    fn test_unbounded_rule_stops_at_bound() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let def = daily(start, "FREQ=DAILY");

        let starts = expand_starts(&def, start, start + Duration::days(9), Tz::UTC).unwrap();

        assert_eq!(starts.len(), 10, "bound is inclusive");
        assert_eq!(starts[0], start);
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_exdate_and_rdate_apply() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut def = daily(start, "FREQ=DAILY;COUNT=3");
        if let Some(r) = def.recurrence.as_mut() {
            r.exdates.push(EventTime::DateTimeUtc(start + Duration::days(1)));
            r.rdates.push(EventTime::DateTimeUtc(start + Duration::days(10)));
        }

        let starts = expand_starts(&def, start, start + Duration::days(30), Tz::UTC).unwrap();

        assert_eq!(
            starts,
            vec![start, start + Duration::days(2), start + Duration::days(10)]
        );
    }

    #[test]
    fn test_floating_start_follows_zone() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let local = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let mut def = daily(Utc.with_ymd_and_hms(2024, 3, 30, 9, 0, 0).unwrap(), "FREQ=DAILY;COUNT=2");
        def.start_time = EventTime::DateTimeFloating(local);

        let starts = expand_starts(&def, def.start, def.start + Duration::days(5), berlin).unwrap();

        // 10:00 local on both sides of the DST switch
        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2024, 3, 30, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 31, 8, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_invalid_rule_is_an_error() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let def = daily(start, "FREQ=SOMETIMES");

        let err = expand_starts(&def, start, start, Tz::UTC).unwrap_err();

        assert!(matches!(err, IcsViewError::InvalidRule(_)));
    }

    #[test]
    fn test_non_recurring_expands_to_nothing() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let def = EventDefinition::new("once", "Once", start, Duration::hours(1));

        assert!(expand_starts(&def, start, start, Tz::UTC).unwrap().is_empty());
    }

    #[test]
    fn test_lower_bound_skips_history() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).unwrap();
        let def = daily(start, "FREQ=HOURLY");
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        let starts = expand_starts(&def, from, from + Duration::hours(2), Tz::UTC).unwrap();

        assert_eq!(starts, vec![from, from + Duration::hours(1), from + Duration::hours(2)]);
    }

    #[test]
    fn test_date_until_on_all_day_event_keeps_last_day() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut def = daily(EventTime::Date(first).to_utc(berlin).unwrap(), "FREQ=MONTHLY;UNTIL=20240601");
        def.start_time = EventTime::Date(first);
        def.duration = Duration::days(1);
        let bound = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let starts = expand_starts(&def, def.start, bound, berlin).unwrap();

        let expected: Vec<_> = (1..=6)
            .map(|m| EventTime::Date(NaiveDate::from_ymd_opt(2024, m, 1).unwrap()).to_utc(berlin).unwrap())
            .collect();
        assert_eq!(starts, expected);
        assert_eq!(starts[0], Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(starts[5], Utc.with_ymd_and_hms(2024, 5, 31, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_floating_until_on_floating_event() {
        let new_york: Tz = "America/New_York".parse().unwrap();
        let local = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let bound = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let weekly = |rrule: &str| {
            let mut def = daily(Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap(), rrule);
            def.start_time = EventTime::DateTimeFloating(local);
            def
        };

        let inclusive = weekly("FREQ=WEEKLY;UNTIL=20240129T100000");
        let starts = expand_starts(&inclusive, inclusive.start, bound, new_york).unwrap();

        let expected: Vec<_> = [1, 8, 15, 22, 29]
            .iter()
            .map(|d| Utc.with_ymd_and_hms(2024, 1, *d, 15, 0, 0).unwrap())
            .collect();
        assert_eq!(starts, expected, "UNTIL equal to the last start includes it");

        let short = weekly("FREQ=WEEKLY;UNTIL=20240129T095959");
        let starts = expand_starts(&short, short.start, bound, new_york).unwrap();

        assert_eq!(starts, expected[..4]);
    }

    #[test]
    fn test_until_on_zoned_event() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let local = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let bound = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let expected: Vec<_> = (1..=3)
            .map(|d| Utc.with_ymd_and_hms(2024, 1, d, 8, 0, 0).unwrap())
            .collect();

        // UTC as RFC 5545 requires, and local time as some producers write it
        for rrule in ["FREQ=DAILY;UNTIL=20240103T080000Z", "FREQ=DAILY;UNTIL=20240103T090000"] {
            let mut def = daily(expected[0], rrule);
            def.start_time = EventTime::DateTimeZoned {
                datetime: local,
                tzid: "Europe/Berlin".to_string(),
            };

            let starts = expand_starts(&def, def.start, bound, Tz::UTC).unwrap();

            assert_eq!(starts, expected, "{}", rrule);
        }
        assert_eq!(expected[0], EventTime::DateTimeFloating(local).to_utc(berlin).unwrap());
    }

    #[test]
    fn test_pin_until_leaves_utc_and_other_parts() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();

        assert_eq!(
            pin_until("FREQ=DAILY;UNTIL=20240103T080000Z;INTERVAL=2", berlin),
            "FREQ=DAILY;UNTIL=20240103T080000Z;INTERVAL=2"
        );
        assert_eq!(
            pin_until("FREQ=YEARLY;UNTIL=20301231", berlin),
            "FREQ=YEARLY;UNTIL=20301231T225959Z"
        );
        assert_eq!(pin_until("FREQ=WEEKLY;COUNT=4", berlin), "FREQ=WEEKLY;COUNT=4");
    }
}
