//! Feed parsing using the icalendar crate's parser.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::warn;

use crate::error::{SyncError, SyncResult};
use crate::event::{RawEvent, RawTime};
use crate::ics::recurrence::{self, Recurrence};

/// Drop DTSTAMP lines (and their folded continuations).
///
/// Some feeds emit stamps that strict parsers reject; nothing downstream uses them.
pub fn repair(content: &str) -> String {
    let mut kept = Vec::new();
    let mut in_stamp = false;

    for line in content.lines() {
        if line.starts_with("DTSTAMP") {
            in_stamp = true;
            continue;
        }
        if in_stamp && (line.starts_with(' ') || line.starts_with('\t')) {
            continue;
        }
        in_stamp = false;
        kept.push(line);
    }

    kept.join("\r\n")
}

/// A VEVENT before recurrence expansion
struct Vevent {
    raw: RawEvent,
    recurrence: Option<Recurrence>,
    /// Set on instance overrides
    recurrence_id: Option<RawTime>,
    cancelled: bool,
}

impl Vevent {
    fn is_master(&self) -> bool {
        self.recurrence.is_some() && self.recurrence_id.is_none()
    }
}

/// Parse feed text into raw events, expanding recurring events from now on.
pub fn parse_feed(content: &str) -> SyncResult<Vec<RawEvent>> {
    parse_feed_at(content, Utc::now())
}

/// Same as [`parse_feed`], with an explicit "now".
///
/// Events come out in feed order; a recurring series is emitted at its
/// master's position, instances in start order. VEVENTs without a UID or
/// DTSTART are skipped with a warning.
pub fn parse_feed_at(content: &str, now: DateTime<Utc>) -> SyncResult<Vec<RawEvent>> {
    let repaired = repair(content);
    let unfolded = unfold(&repaired);
    let calendar = read_calendar(&unfolded).map_err(|e| SyncError::IcsParse(e.to_string()))?;

    let mut vevents = Vec::new();
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match parse_vevent(component) {
            Some(vevent) => vevents.push(vevent),
            None => warn!(
                uid = %component.find_prop("UID").map(|p| p.val.to_string()).unwrap_or_default(),
                "Skipping VEVENT without a usable UID or DTSTART"
            ),
        }
    }

    let series_uids: HashSet<&str> = vevents
        .iter()
        .filter(|v| v.is_master())
        .map(|v| v.raw.uid.as_str())
        .collect();

    let window_end = recurrence::horizon(now);
    let mut events = Vec::new();

    for vevent in &vevents {
        if vevent.recurrence_id.is_some() && series_uids.contains(vevent.raw.uid.as_str()) {
            // Emitted with its series
            continue;
        }

        match &vevent.recurrence {
            Some(rule) if vevent.is_master() => {
                let overrides: Vec<&Vevent> = vevents
                    .iter()
                    .filter(|o| o.raw.uid == vevent.raw.uid && o.recurrence_id.is_some())
                    .collect();

                let mut skip = rule.exdates.clone();
                skip.extend(overrides.iter().filter_map(|o| o.recurrence_id));

                let mut series =
                    match recurrence::expand(&vevent.raw, rule, &skip, now, window_end) {
                        Ok(instances) => instances,
                        Err(e) => {
                            warn!(uid = %vevent.raw.uid, "{}, using the first occurrence only", e);
                            vec![vevent.raw.clone()]
                        }
                    };

                series.extend(
                    overrides
                        .iter()
                        .filter(|o| !o.cancelled)
                        .map(|o| o.raw.clone()),
                );
                series.sort_by_key(|e| e.start.instant);
                events.extend(series);
            }
            _ => events.push(vevent.raw.clone()),
        }
    }

    Ok(events)
}

fn parse_vevent(vevent: &Component) -> Option<Vevent> {
    let uid = vevent.find_prop("UID")?.val.to_string();
    if uid.trim().is_empty() {
        return None;
    }

    let dtstart = DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?;
    let start = to_raw_time(dtstart.clone());

    let end = match vevent.find_prop("DTEND") {
        Some(prop) => to_raw_time(DatePerhapsTime::try_from(prop).ok()?),
        None => default_end(&start, vevent.find_prop("DURATION")),
    };

    let text = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| unescape_ics_value(p.val.as_ref()))
            .unwrap_or_default()
    };

    let recurrence = vevent.find_prop("RRULE").map(|p| Recurrence {
        rule: p.val.to_string(),
        dtstart: recurrence::dtstart_line(&dtstart, &start),
        exdates: vevent
            .properties
            .iter()
            .filter(|p| p.name == "EXDATE")
            .flat_map(parse_exdate_property)
            .collect(),
    });

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_raw_time);

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"));

    Some(Vevent {
        raw: RawEvent {
            uid,
            url: vevent.find_prop("URL").map(|p| p.val.to_string()),
            summary: text("SUMMARY"),
            location: text("LOCATION"),
            description: text("DESCRIPTION"),
            start,
            end,
        },
        recurrence,
        recurrence_id,
        cancelled,
    })
}

/// Parse an EXDATE property into instants.
///
/// Handles `VALUE=DATE`, `TZID=...`, UTC and floating values, comma-separated.
fn parse_exdate_property(prop: &Property) -> Vec<RawTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date || s.len() == 8 {
                return NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(RawTime::date);
            }
            let local =
                NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%dT%H%M%S").ok()?;
            let instant = match (&tzid, s.ends_with('Z')) {
                (Some(tz), false) => in_zone(local, tz),
                _ => local.and_utc(),
            };
            Some(RawTime::instant(instant))
        })
        .collect()
}

/// End for a VEVENT without DTEND: start + DURATION, or RFC 5545's defaults
/// (one day for dates, zero length for date-times).
fn default_end(start: &RawTime, duration: Option<&Property>) -> RawTime {
    let duration = duration
        .and_then(|p| iso8601::duration(p.val.as_ref()).ok())
        .and_then(|d| {
            let std_duration: std::time::Duration = d.into();
            Duration::from_std(std_duration).ok()
        });

    let length = match duration {
        Some(d) => d,
        None if start.date_only => Duration::days(1),
        None => Duration::zero(),
    };

    RawTime {
        instant: start.instant + length,
        date_only: start.date_only,
    }
}

fn to_raw_time(dpt: DatePerhapsTime) -> RawTime {
    match dpt {
        DatePerhapsTime::Date(d) => RawTime::date(d),
        DatePerhapsTime::DateTime(cal_dt) => RawTime::instant(match cal_dt {
            CalendarDateTime::Utc(dt) => dt,
            // Floating times carry no zone; read them as UTC
            CalendarDateTime::Floating(naive) => naive.and_utc(),
            CalendarDateTime::WithTimezone { date_time, tzid } => in_zone(date_time, &tzid),
        }),
    }
}

fn in_zone(local: NaiveDateTime, tzid: &str) -> DateTime<Utc> {
    match tzid.parse::<chrono_tz::Tz>() {
        Ok(tz) => match tz.from_local_datetime(&local).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            // Inside a DST gap: the wall time does not exist, shift past it
            None => tz
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| local.and_utc()),
        },
        Err(_) => {
            warn!(tzid, "Unknown time zone, reading time as UTC");
            local.and_utc()
        }
    }
}

/// Unescape ICS text values per RFC 5545
/// Reverses: \, → , and \; → ; and \\ → \ and \n → newline
fn unescape_ics_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(',') | Some(';') | Some('\\') => {
                    if let Some(escaped) = chars.next() {
                        result.push(escaped);
                    }
                }
                Some('n') | Some('N') => {
                    result.push('\n');
                    chars.next();
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }

    result
}
