use serde::{Deserialize, Serialize};

use crate::event::{EventStatus, EventTime};

/// A change to one optional field of a destination event.
///
/// The store treats an omitted field and an explicitly emptied field
/// differently, so "clear it" has to be its own case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPatch<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<T> FieldPatch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldPatch::Unchanged)
    }
}

impl FieldPatch<String> {
    /// `Set` for non-empty text, `Clear` otherwise
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            FieldPatch::Clear
        } else {
            FieldPatch::Set(text.to_string())
        }
    }
}

/// Full payload of an event to create in the destination store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub external_key: String,
    /// Digest of the feed URL, stored privately so later runs only see their own events
    pub owner_tag: String,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    pub color_tag: Option<String>,
}

/// Changed fields of an existing destination event. `None` means unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub id: String,
    pub summary: Option<String>,
    pub location: FieldPatch<String>,
    pub description: FieldPatch<String>,
    /// Replaces the whole start, including its date vs date-time representation
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub color_tag: Option<String>,
    pub status: Option<EventStatus>,
}

impl EventPatch {
    pub fn new(id: impl Into<String>) -> Self {
        EventPatch {
            id: id.into(),
            summary: None,
            location: FieldPatch::Unchanged,
            description: FieldPatch::Unchanged,
            start: None,
            end: None,
            color_tag: None,
            status: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.location.is_unchanged()
            && self.description.is_unchanged()
            && self.start.is_none()
            && self.end.is_none()
            && self.color_tag.is_none()
            && self.status.is_none()
    }

    /// Names of the fields this patch touches
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.summary.is_some() {
            fields.push("summary");
        }
        if !self.location.is_unchanged() {
            fields.push("location");
        }
        if !self.description.is_unchanged() {
            fields.push("description");
        }
        if self.start.is_some() {
            fields.push("start");
        }
        if self.end.is_some() {
            fields.push("end");
        }
        if self.color_tag.is_some() {
            fields.push("color");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        fields
    }
}

/// Everything one run has to do to one feed's events, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    pub creates: Vec<NewEvent>,
    pub updates: Vec<EventPatch>,
    /// Destination ids
    pub deletes: Vec<String>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// (creates, updates, deletes)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.creates.len(), self.updates.len(), self.deletes.len())
    }
}
