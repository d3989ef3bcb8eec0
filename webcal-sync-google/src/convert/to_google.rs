use chrono::SecondsFormat;
use serde_json::{Map, Value, json};
use webcal_sync_core::reconcile::{EventPatch, FieldPatch, NewEvent};
use webcal_sync_core::EventTime;

use crate::{KEY_PROPERTY, OWNER_PROPERTY};

/// Body for `events.insert`.
///
/// No `iCalUID` is sent: it is unique per calendar, and two feeds may carry the
/// same key. Identity lives in the private properties, scoped by owner tag.
pub fn insert_body(event: &NewEvent) -> Value {
    let mut private = Map::new();
    private.insert(OWNER_PROPERTY.to_string(), json!(event.owner_tag));
    private.insert(KEY_PROPERTY.to_string(), json!(event.external_key));

    let mut body = json!({
        "summary": event.summary,
        "location": event.location,
        "description": event.description,
        "start": event_time(&event.start),
        "end": event_time(&event.end),
        "extendedProperties": { "private": private },
    });

    if let Some(color) = &event.color_tag {
        body["colorId"] = json!(color);
    }

    body
}

/// Body for `events.patch`. Only fields present in the patch are sent.
pub fn patch_body(patch: &EventPatch) -> Value {
    let mut body = Map::new();

    if let Some(summary) = &patch.summary {
        body.insert("summary".to_string(), json!(summary));
    }
    if let Some(value) = text_patch(&patch.location) {
        body.insert("location".to_string(), value);
    }
    if let Some(value) = text_patch(&patch.description) {
        body.insert("description".to_string(), value);
    }
    if let Some(start) = &patch.start {
        body.insert("start".to_string(), event_time(start));
    }
    if let Some(end) = &patch.end {
        body.insert("end".to_string(), event_time(end));
    }
    if let Some(color) = &patch.color_tag {
        body.insert("colorId".to_string(), json!(color));
    }
    if let Some(status) = &patch.status {
        body.insert("status".to_string(), json!(status.as_store_str()));
    }

    Value::Object(body)
}

/// The API treats an empty string as an explicit clear
fn text_patch(patch: &FieldPatch<String>) -> Option<Value> {
    match patch {
        FieldPatch::Unchanged => None,
        FieldPatch::Set(value) => Some(json!(value)),
        FieldPatch::Clear => Some(json!("")),
    }
}

/// The unused representation is nulled so switching between date and
/// dateTime doesn't leave the old one behind.
fn event_time(time: &EventTime) -> Value {
    match time {
        EventTime::Date(d) => json!({
            "date": d.format("%Y-%m-%d").to_string(),
            "dateTime": null,
        }),
        EventTime::DateTime(dt) => json!({
            "dateTime": dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            "date": null,
        }),
    }
}
