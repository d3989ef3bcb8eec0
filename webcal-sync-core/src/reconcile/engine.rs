use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::compare::equivalent;
use crate::config::FeedConfig;
use crate::error::SyncResult;
use crate::event::{DestinationEvent, EventStatus, EventTime, SourceEvent, StoredTime};
use crate::reconcile::plan::{EventPatch, FieldPatch, NewEvent, ReconciliationPlan};

/// Compute the plan that converges `destinations` to `sources` as of now.
pub fn reconcile(
    config: &FeedConfig,
    sources: &[SourceEvent],
    destinations: &[DestinationEvent],
) -> SyncResult<ReconciliationPlan> {
    reconcile_at(config, sources, destinations, Utc::now())
}

/// Same as [`reconcile`], with an explicit "now".
///
/// `destinations` must already be limited to events created for this feed.
pub fn reconcile_at(
    config: &FeedConfig,
    sources: &[SourceEvent],
    destinations: &[DestinationEvent],
    now: DateTime<Utc>,
) -> SyncResult<ReconciliationPlan> {
    // Fails before any event is looked at
    let id_format = config.id_format()?;
    let owner_tag = config.owner_tag();

    let mut by_key: HashMap<&str, &DestinationEvent> = HashMap::new();
    for existing in destinations {
        if existing.external_key.is_empty() {
            warn!(id = %existing.id, "Destination event has no identity key");
            continue;
        }
        if by_key.contains_key(existing.external_key.as_str()) {
            warn!(
                id = %existing.id,
                key = %existing.external_key,
                "Destination holds a second event for the same key"
            );
            continue;
        }
        by_key.insert(existing.external_key.as_str(), existing);
    }

    let mut plan = ReconciliationPlan::default();
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut matched_ids: HashSet<&str> = HashSet::new();

    for source in sources {
        if source.start < now {
            debug!(uid = %source.uid, "Skipping event that already started");
            continue;
        }

        let key = id_format.resolve(source);

        if !seen_keys.insert(key.clone()) {
            warn!(key = %key, summary = %source.summary, "Duplicate id in feed, not processing");
            continue;
        }

        match by_key.remove(key.as_str()) {
            None => {
                debug!(key = %key, "Creating");
                plan.creates.push(new_event(config, &owner_tag, source, key));
            }
            Some(existing) => {
                matched_ids.insert(existing.id.as_str());
                if let Some(patch) = diff_event(config, source, existing)? {
                    debug!(id = %patch.id, fields = ?patch.changed_fields(), "Updating");
                    plan.updates.push(patch);
                }
            }
        }
    }

    for existing in destinations {
        if matched_ids.contains(existing.id.as_str()) {
            continue;
        }
        if existing.status == EventStatus::Cancelled {
            continue;
        }

        let start = existing.start.parse(&existing.id)?.to_utc();
        if now < start {
            plan.deletes.push(existing.id.clone());
        } else {
            info!(
                "Not deleting event {} because it already started",
                existing.summary
            );
        }
    }

    Ok(plan)
}

fn new_event(
    config: &FeedConfig,
    owner_tag: &str,
    source: &SourceEvent,
    external_key: String,
) -> NewEvent {
    NewEvent {
        external_key,
        owner_tag: owner_tag.to_string(),
        summary: source.summary.clone(),
        location: source.location.clone(),
        description: source.description.clone(),
        start: source.start_time(),
        end: source.end_time(),
        color_tag: config.color_id.clone(),
    }
}

/// `None` when the destination already matches.
fn diff_event(
    config: &FeedConfig,
    source: &SourceEvent,
    existing: &DestinationEvent,
) -> SyncResult<Option<EventPatch>> {
    let mut patch = EventPatch::new(&existing.id);

    if source.summary != existing.summary {
        patch.summary = Some(source.summary.clone());
    }
    if source.location != existing.location {
        patch.location = FieldPatch::from_text(&source.location);
    }
    if source.description != existing.description {
        patch.description = FieldPatch::from_text(&source.description);
    }

    let start = source.start_time();
    if time_changed(existing, &existing.start, &start)? {
        patch.start = Some(start);
    }

    let end = source.end_time();
    if time_changed(existing, &existing.end, &end)? {
        patch.end = Some(end);
    }

    if let Some(color) = &config.color_id {
        if existing.color_tag.as_ref() != Some(color) {
            patch.color_tag = Some(color.clone());
        }
    }

    // Heals events someone cancelled by hand
    if existing.status != EventStatus::Confirmed {
        patch.status = Some(EventStatus::Confirmed);
    }

    Ok((!patch.is_empty()).then_some(patch))
}

/// Cancelled events may come back without times; those are simply rewritten.
fn time_changed(
    existing: &DestinationEvent,
    stored: &StoredTime,
    wanted: &EventTime,
) -> SyncResult<bool> {
    if existing.status == EventStatus::Cancelled && stored.is_empty() {
        return Ok(true);
    }
    Ok(!equivalent(&stored.parse(&existing.id)?, wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn tomorrow_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 2, hour, 0, 0).unwrap()
    }

    fn feed() -> FeedConfig {
        FeedConfig::new("https://example.com/feed.ics")
    }

    fn timed(uid: &str, summary: &str, start: DateTime<Utc>) -> SourceEvent {
        SourceEvent {
            uid: uid.to_string(),
            url: None,
            summary: summary.to_string(),
            location: String::new(),
            description: String::new(),
            start,
            end: start + Duration::hours(1),
            all_day: false,
        }
    }

    fn all_day(uid: &str, summary: &str, date: NaiveDate) -> SourceEvent {
        let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        SourceEvent {
            uid: uid.to_string(),
            url: None,
            summary: summary.to_string(),
            location: String::new(),
            description: String::new(),
            start,
            end: start + Duration::days(1),
            all_day: true,
        }
    }

    /// What the store would hand back after creating `event`
    fn stored(id: &str, event: &NewEvent) -> DestinationEvent {
        DestinationEvent {
            id: id.to_string(),
            external_key: event.external_key.clone(),
            summary: event.summary.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            start: event.start.into(),
            end: event.end.into(),
            color_tag: event.color_tag.clone(),
            status: EventStatus::Confirmed,
        }
    }

    fn existing(id: &str, key: &str, summary: &str, start: DateTime<Utc>) -> DestinationEvent {
        DestinationEvent {
            id: id.to_string(),
            external_key: key.to_string(),
            summary: summary.to_string(),
            location: String::new(),
            description: String::new(),
            start: EventTime::DateTime(start).into(),
            end: EventTime::DateTime(start + Duration::hours(1)).into(),
            color_tag: None,
            status: EventStatus::Confirmed,
        }
    }

    #[test]
    fn test_new_source_event_is_created() {
        let sources = vec![timed("a", "Standup", tomorrow_at(10))];

        let plan = reconcile_at(&feed(), &sources, &[], now()).unwrap();

        assert_eq!(plan.creates.len(), 1);
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());

        let created = &plan.creates[0];
        assert_eq!(created.external_key, "a");
        assert_eq!(created.summary, "Standup");
        assert_eq!(created.start, EventTime::DateTime(tomorrow_at(10)));
        assert_eq!(created.end, EventTime::DateTime(tomorrow_at(11)));
        assert_eq!(created.owner_tag, feed().owner_tag());
    }

    #[test]
    fn test_changed_summary_yields_summary_only_update() {
        let sources = vec![timed("a", "Standup (moved)", tomorrow_at(10))];
        let destinations = vec![existing("d1", "a", "Standup", tomorrow_at(10))];

        let plan = reconcile_at(&feed(), &sources, &destinations, now()).unwrap();

        assert!(plan.creates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.updates.len(), 1);

        let update = &plan.updates[0];
        assert_eq!(update.id, "d1");
        assert_eq!(update.summary.as_deref(), Some("Standup (moved)"));
        assert_eq!(update.changed_fields(), vec!["summary"]);
    }

    #[test]
    fn test_second_run_over_created_events_is_empty() {
        let mut with_details = timed("b", "Review", tomorrow_at(14));
        with_details.location = "Room 4".to_string();
        with_details.description = "Bring notes".to_string();

        let sources = vec![
            timed("a", "Standup", tomorrow_at(10)),
            with_details,
            all_day("c", "Offsite", NaiveDate::from_ymd_opt(2026, 6, 3).unwrap()),
        ];
        let config = FeedConfig {
            color_id: Some("7".to_string()),
            ..feed()
        };

        let first = reconcile_at(&config, &sources, &[], now()).unwrap();
        assert_eq!(first.creates.len(), 3);

        let destinations: Vec<_> = first
            .creates
            .iter()
            .enumerate()
            .map(|(i, e)| stored(&format!("d{}", i), e))
            .collect();

        let second = reconcile_at(&config, &sources, &destinations, now()).unwrap();
        assert!(second.is_empty(), "Expected no changes, got {:?}", second);
    }

    #[test]
    fn test_past_source_events_are_ignored() {
        let sources = vec![
            timed("old", "Yesterday", now() - Duration::days(1)),
            timed("started", "In progress", now() - Duration::minutes(5)),
        ];
        let destinations = vec![existing(
            "d1",
            "started",
            "Old title",
            now() - Duration::minutes(5),
        )];

        let plan = reconcile_at(&feed(), &sources, &destinations, now()).unwrap();

        assert!(plan.creates.is_empty());
        assert!(plan.updates.is_empty());
        // Unmatched, but already started: left alone
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_duplicate_uid_in_feed_is_processed_once() {
        let sources = vec![
            timed("a", "First copy", tomorrow_at(10)),
            timed("a", "Second copy", tomorrow_at(12)),
        ];

        let plan = reconcile_at(&feed(), &sources, &[], now()).unwrap();

        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].summary, "First copy");
    }

    #[test]
    fn test_duplicate_url_digest_is_processed_once() {
        let mut first = timed("uid-1", "Booking", tomorrow_at(10));
        first.url = Some("https://example.com/b/1".to_string());
        let mut second = timed("uid-2", "Booking again", tomorrow_at(10));
        second.url = Some("https://example.com/b/1".to_string());
        let mut third = timed("uid-1", "Other booking", tomorrow_at(15));
        third.url = Some("https://example.com/b/2".to_string());

        let config = FeedConfig {
            id_format: "url".to_string(),
            ..feed()
        };
        let plan = reconcile_at(&config, &[first, second, third], &[], now()).unwrap();

        let summaries: Vec<_> = plan.creates.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Booking", "Other booking"]);
    }

    #[test]
    fn test_orphans_deleted_only_when_in_future_and_not_cancelled() {
        let mut cancelled = existing("d3", "gone-cancelled", "Cancelled", tomorrow_at(9));
        cancelled.status = EventStatus::Cancelled;

        let destinations = vec![
            existing("d1", "gone-future", "Future", tomorrow_at(10)),
            existing("d2", "gone-past", "Past", now() - Duration::hours(2)),
            cancelled,
            existing("d4", "gone-later", "Later", tomorrow_at(16)),
        ];

        let plan = reconcile_at(&feed(), &[], &destinations, now()).unwrap();

        assert_eq!(plan.deletes, vec!["d1".to_string(), "d4".to_string()]);
    }

    #[test]
    fn test_all_day_source_corrects_date_time_representation() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();
        let source = all_day("h", "Holiday", date);

        // Stored as instants at exactly the right midnights
        let destination = DestinationEvent {
            start: StoredTime::from_date_time("2026-06-03T00:00:00Z"),
            end: StoredTime::from_date_time("2026-06-04T00:00:00Z"),
            ..existing("d1", "h", "Holiday", tomorrow_at(0))
        };

        let plan = reconcile_at(&feed(), &[source], &[destination], now()).unwrap();

        assert_eq!(plan.updates.len(), 1);
        let update = &plan.updates[0];
        assert_eq!(update.start, Some(EventTime::Date(date)));
        assert_eq!(update.end, Some(EventTime::Date(date.succ_opt().unwrap())));
        assert!(update.summary.is_none());
    }

    #[test]
    fn test_subsecond_difference_is_not_an_update() {
        let source = timed("a", "Standup", tomorrow_at(10));
        let destination = DestinationEvent {
            start: StoredTime::from_date_time("2026-06-02T10:00:00.400Z"),
            ..existing("d1", "a", "Standup", tomorrow_at(10))
        };

        let plan = reconcile_at(&feed(), &[source], &[destination], now()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_emptied_text_fields_are_cleared() {
        let mut source = timed("a", "Standup", tomorrow_at(10));
        source.location = "Zoom".to_string();

        let destination = DestinationEvent {
            location: "Room 1".to_string(),
            description: "Agenda attached".to_string(),
            ..existing("d1", "a", "Standup", tomorrow_at(10))
        };

        let plan = reconcile_at(&feed(), &[source], &[destination], now()).unwrap();

        let update = &plan.updates[0];
        assert_eq!(update.location, FieldPatch::Set("Zoom".to_string()));
        assert_eq!(update.description, FieldPatch::Clear);
    }

    #[test]
    fn test_cancelled_match_is_confirmed_again_and_recolored() {
        let source = timed("a", "Standup", tomorrow_at(10));
        let destination = DestinationEvent {
            status: EventStatus::Cancelled,
            color_tag: Some("1".to_string()),
            ..existing("d1", "a", "Standup", tomorrow_at(10))
        };
        let config = FeedConfig {
            color_id: Some("5".to_string()),
            ..feed()
        };

        let plan = reconcile_at(&config, &[source], &[destination], now()).unwrap();

        let update = &plan.updates[0];
        assert_eq!(update.status, Some(EventStatus::Confirmed));
        assert_eq!(update.color_tag.as_deref(), Some("5"));
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn test_cancelled_match_without_times_is_rewritten() {
        let source = timed("a", "Standup", tomorrow_at(10));
        let destination = DestinationEvent {
            start: StoredTime::default(),
            end: StoredTime::default(),
            status: EventStatus::Cancelled,
            ..existing("d1", "a", "Standup", tomorrow_at(10))
        };

        let plan = reconcile_at(&feed(), &[source], &[destination], now()).unwrap();

        let update = &plan.updates[0];
        assert_eq!(update.start, Some(EventTime::DateTime(tomorrow_at(10))));
        assert_eq!(update.end, Some(EventTime::DateTime(tomorrow_at(11))));
        assert_eq!(update.status, Some(EventStatus::Confirmed));
    }

    #[test]
    fn test_unconfigured_color_is_left_alone() {
        let source = timed("a", "Standup", tomorrow_at(10));
        let destination = DestinationEvent {
            color_tag: Some("3".to_string()),
            ..existing("d1", "a", "Standup", tomorrow_at(10))
        };

        let plan = reconcile_at(&feed(), &[source], &[destination], now()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_unknown_id_format_fails_before_processing() {
        let config = FeedConfig {
            id_format: "sequence".to_string(),
            ..feed()
        };

        let result = reconcile_at(&config, &[], &[], now());
        assert!(matches!(result, Err(SyncError::UnknownIdFormat(f)) if f == "sequence"));
    }

    #[test]
    fn test_malformed_orphan_start_is_fatal() {
        let destination = DestinationEvent {
            start: StoredTime::from_date_time("2026-13-45T99:00:00Z"),
            ..existing("d1", "gone", "Broken", tomorrow_at(10))
        };

        let result = reconcile_at(&feed(), &[], &[destination], now());
        assert!(matches!(result, Err(SyncError::MalformedTimestamp { .. })));
    }

    #[test]
    fn test_malformed_cancelled_orphan_is_skipped() {
        let destination = DestinationEvent {
            start: StoredTime::default(),
            status: EventStatus::Cancelled,
            ..existing("d1", "gone", "Broken", tomorrow_at(10))
        };

        let plan = reconcile_at(&feed(), &[], &[destination], now()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_all_day_orphan_in_future_is_deleted() {
        let destination = DestinationEvent {
            start: StoredTime::from_date("2026-06-10"),
            end: StoredTime::from_date("2026-06-11"),
            ..existing("d1", "gone", "Trip", tomorrow_at(10))
        };

        let plan = reconcile_at(&feed(), &[], &[destination], now()).unwrap();
        assert_eq!(plan.deletes, vec!["d1".to_string()]);
    }

    #[test]
    fn test_second_destination_copy_of_a_key_is_deleted() {
        let sources = vec![timed("a", "Standup", tomorrow_at(10))];
        let destinations = vec![
            existing("d1", "a", "Standup", tomorrow_at(10)),
            existing("d2", "a", "Standup", tomorrow_at(10)),
        ];

        let plan = reconcile_at(&feed(), &sources, &destinations, now()).unwrap();

        assert!(plan.creates.is_empty());
        assert!(plan.updates.is_empty());
        assert_eq!(plan.deletes, vec!["d2".to_string()]);
    }
}
