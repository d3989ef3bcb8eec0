//! Turn raw feed events into comparable `SourceEvent`s.

use chrono::{DateTime, NaiveTime, SubsecRound, Utc};

use crate::event::{RawEvent, SourceEvent};

pub fn normalize(raw: RawEvent) -> SourceEvent {
    let all_day = raw.start.date_only || raw.end.date_only;

    let truncate: fn(DateTime<Utc>) -> DateTime<Utc> =
        if all_day { start_of_day } else { whole_second };

    let url = raw
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    SourceEvent {
        uid: raw.uid.trim().to_string(),
        url,
        summary: raw.summary.trim().to_string(),
        location: raw.location.trim().to_string(),
        description: raw.description.trim().to_string(),
        start: truncate(raw.start.instant),
        end: truncate(raw.end.instant),
        all_day,
    }
}

/// Some parsers end a day at 23:59:59.999; the store keeps a plain date.
fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn whole_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawTime;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn raw(start: RawTime, end: RawTime) -> RawEvent {
        RawEvent {
            uid: "  uid-1 \n".to_string(),
            url: Some("   ".to_string()),
            summary: "\n   Team lunch  ".to_string(),
            location: "\tCafeteria ".to_string(),
            description: "  ".to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_text_fields_are_trimmed() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let event = normalize(raw(RawTime::instant(at), RawTime::instant(at)));

        assert_eq!(event.uid, "uid-1");
        assert_eq!(event.summary, "Team lunch");
        assert_eq!(event.location, "Cafeteria");
        assert_eq!(event.description, "");
        assert_eq!(event.url, None, "Whitespace-only URL should be dropped");
    }

    #[test]
    fn test_timed_event_drops_subseconds() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let jittered = at + Duration::milliseconds(734);
        let event = normalize(raw(RawTime::instant(jittered), RawTime::instant(jittered)));

        assert!(!event.all_day);
        assert_eq!(event.start, at);
        assert_eq!(event.end, at);
    }

    #[test]
    fn test_date_marker_on_either_side_makes_all_day() {
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).unwrap();

        let event = normalize(raw(RawTime::instant(at), RawTime::date(day)));
        assert!(event.all_day);
        assert_eq!(event.start, Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_all_day_end_just_before_midnight_truncates_to_day() {
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let end = RawTime {
            instant: Utc.with_ymd_and_hms(2026, 5, 1, 23, 59, 59).unwrap()
                + Duration::milliseconds(999),
            date_only: true,
        };
        let event = normalize(raw(RawTime::date(day), end));

        assert_eq!(event.end, Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
    }
}
