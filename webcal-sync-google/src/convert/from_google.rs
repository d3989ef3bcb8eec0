use webcal_sync_core::{DestinationEvent, EventStatus, StoredTime};

use crate::KEY_PROPERTY;
use crate::types::{GoogleEvent, GoogleEventTime};

pub trait FromGoogle {
    fn from_google(event: GoogleEvent) -> Self;
}

impl FromGoogle for DestinationEvent {
    /// Timestamps are passed through untouched; the engine rejects ones it can't read.
    fn from_google(event: GoogleEvent) -> Self {
        let external_key = event
            .extended_properties
            .as_ref()
            .and_then(|props| props.private.get(KEY_PROPERTY))
            .cloned()
            .unwrap_or_default();

        DestinationEvent {
            id: event.id,
            external_key,
            summary: event.summary,
            location: event.location,
            description: event.description,
            start: stored_time(event.start),
            end: stored_time(event.end),
            color_tag: event.color_id.filter(|c| !c.is_empty()),
            status: EventStatus::from_store_str(&event.status),
        }
    }
}

fn stored_time(time: Option<GoogleEventTime>) -> StoredTime {
    match time {
        Some(t) => StoredTime {
            date: t.date,
            date_time: t.date_time,
        },
        None => StoredTime::default(),
    }
}
