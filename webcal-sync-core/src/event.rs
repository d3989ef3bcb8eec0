//! Event types shared by the feed side and the destination side.
//!
//! A feed VEVENT travels `RawEvent` -> `SourceEvent` (see `normalize`), while
//! the destination store hands us `DestinationEvent`s whose timestamps are kept
//! exactly as the store returned them, so the engine decides how to treat
//! values it cannot parse.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// A point on the calendar: a whole day or a precise instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl EventTime {
    /// The instant this time starts at. Dates start at UTC midnight.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            EventTime::DateTime(dt) => *dt,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%SZ")),
        }
    }
}

/// A timestamp as the feed parser produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTime {
    pub instant: DateTime<Utc>,
    /// The source marked this value as a plain date (`VALUE=DATE`)
    pub date_only: bool,
}

impl RawTime {
    pub fn date(date: NaiveDate) -> Self {
        RawTime {
            instant: date.and_time(chrono::NaiveTime::MIN).and_utc(),
            date_only: true,
        }
    }

    pub fn instant(instant: DateTime<Utc>) -> Self {
        RawTime {
            instant,
            date_only: false,
        }
    }
}

/// A feed event before normalization. Text fields are untrimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub uid: String,
    pub url: Option<String>,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: RawTime,
    pub end: RawTime,
}

/// A normalized feed event, ready to be diffed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub uid: String,
    pub url: Option<String>,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

impl SourceEvent {
    /// Start in the representation the destination should store.
    pub fn start_time(&self) -> EventTime {
        self.represent(self.start)
    }

    /// End in the representation the destination should store.
    pub fn end_time(&self) -> EventTime {
        self.represent(self.end)
    }

    fn represent(&self, instant: DateTime<Utc>) -> EventTime {
        if self.all_day {
            EventTime::Date(instant.date_naive())
        } else {
            EventTime::DateTime(instant)
        }
    }
}

impl fmt::Display for SourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// A start or end value exactly as the destination store returned it.
///
/// Exactly one of the two fields is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
}

impl StoredTime {
    pub fn from_date(date: impl Into<String>) -> Self {
        StoredTime {
            date: Some(date.into()),
            date_time: None,
        }
    }

    pub fn from_date_time(date_time: impl Into<String>) -> Self {
        StoredTime {
            date: None,
            date_time: Some(date_time.into()),
        }
    }

    /// Neither representation present, as on some cancelled events
    pub fn is_empty(&self) -> bool {
        self.date.as_deref().unwrap_or_default().is_empty()
            && self.date_time.as_deref().unwrap_or_default().is_empty()
    }

    /// Parse the stored value. `event_id` is only used for the error message.
    pub fn parse(&self, event_id: &str) -> SyncResult<EventTime> {
        let malformed = |value: &str| SyncError::MalformedTimestamp {
            event_id: event_id.to_string(),
            value: value.to_string(),
        };

        match (self.date.as_deref(), self.date_time.as_deref()) {
            (Some(date), _) if !date.is_empty() => NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map(EventTime::Date)
                .map_err(|_| malformed(date)),
            (_, Some(date_time)) => DateTime::parse_from_rfc3339(date_time)
                .map(|dt| EventTime::DateTime(dt.with_timezone(&Utc)))
                .map_err(|_| malformed(date_time)),
            _ => Err(malformed("")),
        }
    }
}

impl From<EventTime> for StoredTime {
    fn from(time: EventTime) -> Self {
        match time {
            EventTime::Date(d) => StoredTime::from_date(d.format("%Y-%m-%d").to_string()),
            EventTime::DateTime(dt) => {
                StoredTime::from_date_time(dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Cancelled,
    Other(String),
}

impl EventStatus {
    pub fn from_store_str(s: &str) -> Self {
        match s {
            "confirmed" => EventStatus::Confirmed,
            "cancelled" => EventStatus::Cancelled,
            other => EventStatus::Other(other.to_string()),
        }
    }

    pub fn as_store_str(&self) -> &str {
        match self {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Other(s) => s,
        }
    }
}

/// An event in the destination store that an earlier run created for a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationEvent {
    pub id: String,
    /// Identity key stored on the event when it was created
    pub external_key: String,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: StoredTime,
    pub end: StoredTime,
    pub color_tag: Option<String>,
    pub status: EventStatus,
}

impl fmt::Display for DestinationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}
