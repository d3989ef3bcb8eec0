use tracing::{debug, info};

use crate::error::SyncResult;
use crate::reconcile::ReconciliationPlan;
use crate::sync::{EventStore, WriteOutcome};

/// Statistics from applying one plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Writes the store reported as already in place
    pub converged: usize,
}

/// Apply creates, then updates, then deletes.
///
/// The first write that fails stops the run; writes already made stay made.
pub async fn apply_plan<S: EventStore>(
    store: &S,
    plan: &ReconciliationPlan,
) -> SyncResult<ApplyStats> {
    let mut stats = ApplyStats::default();

    for event in &plan.creates {
        match store.insert_event(event).await? {
            WriteOutcome::Applied => stats.created += 1,
            WriteOutcome::AlreadyConverged => {
                info!(key = %event.external_key, "Event already existed: {}", event.summary);
                stats.converged += 1;
            }
        }
    }

    for patch in &plan.updates {
        match store.patch_event(patch).await? {
            WriteOutcome::Applied => stats.updated += 1,
            WriteOutcome::AlreadyConverged => stats.converged += 1,
        }
    }

    for id in &plan.deletes {
        match store.delete_event(id).await? {
            WriteOutcome::Applied => stats.deleted += 1,
            WriteOutcome::AlreadyConverged => {
                debug!(id = %id, "Event was already deleted");
                stats.converged += 1;
            }
        }
    }

    Ok(stats)
}

/// Stats aggregated over several feeds
pub struct BatchStats(pub Vec<ApplyStats>);

impl BatchStats {
    pub fn totals(&self) -> ApplyStats {
        self.0.iter().fold(ApplyStats::default(), |acc, s| ApplyStats {
            created: acc.created + s.created,
            updated: acc.updated + s.updated,
            deleted: acc.deleted + s.deleted,
            converged: acc.converged + s.converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::event::{DestinationEvent, EventTime};
    use crate::reconcile::{EventPatch, NewEvent};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Records every call; keys in `conflicts` answer inserts with AlreadyConverged,
    /// ids in `gone` answer deletes with AlreadyConverged, ids in `failing` make
    /// deletes fail.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
        conflicts: Vec<String>,
        gone: Vec<String>,
        failing: Vec<String>,
    }

    impl EventStore for RecordingStore {
        async fn list_events(&self, _owner_tag: &str) -> SyncResult<Vec<DestinationEvent>> {
            Ok(vec![])
        }

        async fn insert_event(&self, event: &NewEvent) -> SyncResult<WriteOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("insert {}", event.external_key));
            if self.conflicts.contains(&event.external_key) {
                Ok(WriteOutcome::AlreadyConverged)
            } else {
                Ok(WriteOutcome::Applied)
            }
        }

        async fn patch_event(&self, patch: &EventPatch) -> SyncResult<WriteOutcome> {
            self.calls.lock().unwrap().push(format!("patch {}", patch.id));
            Ok(WriteOutcome::Applied)
        }

        async fn delete_event(&self, id: &str) -> SyncResult<WriteOutcome> {
            self.calls.lock().unwrap().push(format!("delete {}", id));
            if self.failing.iter().any(|f| f == id) {
                return Err(SyncError::Provider(format!("Failed to delete event: {}", id)));
            }
            if self.gone.iter().any(|g| g == id) {
                return Ok(WriteOutcome::AlreadyConverged);
            }
            Ok(WriteOutcome::Applied)
        }
    }

    fn new_event(key: &str) -> NewEvent {
        let start = Utc.with_ymd_and_hms(2026, 6, 2, 10, 0, 0).unwrap();
        NewEvent {
            external_key: key.to_string(),
            owner_tag: "tag".to_string(),
            summary: key.to_uppercase(),
            location: String::new(),
            description: String::new(),
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(start),
            color_tag: None,
        }
    }

    fn plan() -> ReconciliationPlan {
        ReconciliationPlan {
            creates: vec![new_event("a"), new_event("b")],
            updates: vec![EventPatch {
                summary: Some("Renamed".to_string()),
                ..EventPatch::new("d1")
            }],
            deletes: vec!["d2".to_string(), "d3".to_string()],
        }
    }

    #[tokio::test]
    async fn test_applies_creates_then_updates_then_deletes() {
        let store = RecordingStore::default();

        let stats = apply_plan(&store, &plan()).await.unwrap();

        assert_eq!(
            *store.calls.lock().unwrap(),
            vec!["insert a", "insert b", "patch d1", "delete d2", "delete d3"]
        );
        assert_eq!(
            stats,
            ApplyStats {
                created: 2,
                updated: 1,
                deleted: 2,
                converged: 0
            }
        );
    }

    #[tokio::test]
    async fn test_conflicting_create_counts_as_converged() {
        let store = RecordingStore {
            conflicts: vec!["a".to_string()],
            ..Default::default()
        };

        let stats = apply_plan(&store, &plan()).await.unwrap();

        assert_eq!(stats.created, 1);
        assert_eq!(stats.converged, 1);
        assert_eq!(stats.deleted, 2);
    }

    #[tokio::test]
    async fn test_delete_of_gone_event_counts_as_converged() {
        let store = RecordingStore {
            gone: vec!["d3".to_string()],
            ..Default::default()
        };

        let stats = apply_plan(&store, &plan()).await.unwrap();

        assert_eq!(
            stats,
            ApplyStats {
                created: 2,
                updated: 1,
                deleted: 1,
                converged: 1
            }
        );
        assert_eq!(
            store.calls.lock().unwrap().last().map(String::as_str),
            Some("delete d3")
        );
    }

    #[tokio::test]
    async fn test_failed_write_stops_the_run() {
        let store = RecordingStore {
            failing: vec!["d2".to_string()],
            ..Default::default()
        };

        let result = apply_plan(&store, &plan()).await;

        assert!(matches!(result, Err(SyncError::Provider(_))));
        assert_eq!(
            store.calls.lock().unwrap().last().map(String::as_str),
            Some("delete d2")
        );
    }

    #[test]
    fn test_batch_totals() {
        let batch = BatchStats(vec![
            ApplyStats {
                created: 1,
                updated: 2,
                deleted: 0,
                converged: 1,
            },
            ApplyStats {
                created: 3,
                updated: 0,
                deleted: 4,
                converged: 0,
            },
        ]);

        assert_eq!(
            batch.totals(),
            ApplyStats {
                created: 4,
                updated: 2,
                deleted: 4,
                converged: 1
            }
        );
    }
}
