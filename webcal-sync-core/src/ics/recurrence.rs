//! RRULE expansion for recurring feed events.
//!
//! A master VEVENT is expanded into one `RawEvent` per occurrence inside a
//! bounded window. Every instance keeps the master's UID.

use chrono::{DateTime, Duration, Months, Utc};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use rrule::RRuleSet;

use crate::error::{SyncError, SyncResult};
use crate::event::{RawEvent, RawTime};

/// How far ahead of "now" a series is expanded
const HORIZON_MONTHS: u32 = 3;

/// Upper bound on instances taken from one series
const MAX_INSTANCES: u16 = 365;

/// The recurrence part of a master VEVENT.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub rule: String,
    /// DTSTART line as the rrule parser expects it
    pub dtstart: String,
    pub exdates: Vec<RawTime>,
}

/// End of the expansion window starting at `now`.
pub fn horizon(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(HORIZON_MONTHS))
        .unwrap_or(now + Duration::days(92))
}

/// Build the DTSTART line for a master's start.
///
/// Zoned starts keep their TZID so weekly 09:00 stays 09:00 across DST.
/// Dates become UTC midnight; floating times are read as UTC.
pub fn dtstart_line(start: &DatePerhapsTime, resolved: &RawTime) -> String {
    match start {
        DatePerhapsTime::Date(d) => format!("DTSTART:{}T000000Z", d.format("%Y%m%d")),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid })
            if tzid.parse::<chrono_tz::Tz>().is_ok() =>
        {
            format!(
                "DTSTART;TZID={}:{}",
                tzid,
                date_time.format("%Y%m%dT%H%M%S")
            )
        }
        _ => format!("DTSTART:{}", resolved.instant.format("%Y%m%dT%H%M%SZ")),
    }
}

/// Occurrences of `master` that start inside `[window_start, window_end]`,
/// minus those listed in `skip` (EXDATEs and overridden instances).
pub fn expand(
    master: &RawEvent,
    recurrence: &Recurrence,
    skip: &[RawTime],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> SyncResult<Vec<RawEvent>> {
    let rule_text = format!("{}\nRRULE:{}", recurrence.dtstart, recurrence.rule);

    let rule_set: RRuleSet = rule_text.parse().map_err(|e| {
        SyncError::IcsParse(format!(
            "Failed to parse RRULE for event '{}': {}",
            master.uid, e
        ))
    })?;

    // after/before are exclusive
    let tz: rrule::Tz = Utc.into();
    let after = (window_start - Duration::seconds(1)).with_timezone(&tz);
    let before = (window_end + Duration::seconds(1)).with_timezone(&tz);

    let occurrences = rule_set.after(after).before(before).all(MAX_INSTANCES);
    let length = master.end.instant - master.start.instant;

    Ok(occurrences
        .dates
        .iter()
        .map(|occurrence| occurrence.with_timezone(&Utc))
        .filter(|instant| !skip.iter().any(|s| same_instance(s, *instant)))
        .map(|instant| RawEvent {
            start: RawTime {
                instant,
                date_only: master.start.date_only,
            },
            end: RawTime {
                instant: instant + length,
                date_only: master.end.date_only,
            },
            ..master.clone()
        })
        .collect())
}

fn same_instance(excluded: &RawTime, instant: DateTime<Utc>) -> bool {
    if excluded.date_only {
        excluded.instant.date_naive() == instant.date_naive()
    } else {
        excluded.instant == instant
    }
}
