//! Calendar v3 events endpoints, backing the `EventStore` seam.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{SecondsFormat, Utc};
use reqwest::{Response, StatusCode};
use url::Url;
use webcal_sync_core::reconcile::{EventPatch, NewEvent};
use webcal_sync_core::sync::{EventStore, WriteOutcome};
use webcal_sync_core::{DestinationEvent, SyncError, SyncResult};

use crate::OWNER_PROPERTY;
use crate::convert::{FromGoogle, insert_body, patch_body};
use crate::session::Session;
use crate::types::EventsPage;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const PAGE_SIZE: &str = "2500";

/// One Google calendar, accessed with a valid session
pub struct GoogleCalendar {
    http: reqwest::Client,
    access_token: String,
    calendar_id: String,
}

impl GoogleCalendar {
    /// Load (and refresh if needed) the stored session for `calendar_id`
    pub async fn connect(calendar_id: &str) -> Result<Self> {
        let session = Session::load_valid().await?;

        Ok(GoogleCalendar {
            http: reqwest::Client::new(),
            access_token: session.access_token().to_string(),
            calendar_id: calendar_id.to_string(),
        })
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url> {
        events_url(&self.calendar_id, event_id)
    }

    /// Events tagged with `owner_tag` that haven't ended yet, cancelled ones included
    pub async fn fetch_owned(&self, owner_tag: &str) -> Result<Vec<DestinationEvent>> {
        let time_min = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let owner_filter = format!("{}={}", OWNER_PROPERTY, owner_tag);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.events_url(None)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("privateExtendedProperty", &owner_filter)
                    .append_pair("showDeleted", "true")
                    .append_pair("timeMin", &time_min)
                    .append_pair("maxResults", PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self
                .http
                .get(url)
                .bearer_auth(&self.access_token)
                .send()
                .await
                .context("Failed to list events")?;

            let page: EventsPage = ensure_success(response, "list events")
                .await?
                .json()
                .await
                .context("Failed to parse events page")?;

            events.extend(page.items.into_iter().map(DestinationEvent::from_google));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = events.len(), owner_tag, "Listed destination events");

        Ok(events)
    }

    pub async fn insert(&self, event: &NewEvent) -> Result<WriteOutcome> {
        let response = self
            .http
            .post(self.events_url(None)?)
            .bearer_auth(&self.access_token)
            .json(&insert_body(event))
            .send()
            .await
            .with_context(|| format!("Failed to create event: {}", event.summary))?;

        finish_write(Write::Insert, response, &format!("create event {}", event.summary)).await
    }

    pub async fn patch(&self, patch: &EventPatch) -> Result<WriteOutcome> {
        let response = self
            .http
            .patch(self.events_url(Some(&patch.id))?)
            .bearer_auth(&self.access_token)
            .json(&patch_body(patch))
            .send()
            .await
            .with_context(|| format!("Failed to update event: {}", patch.id))?;

        finish_write(Write::Patch, response, &format!("update event {}", patch.id)).await
    }

    pub async fn delete(&self, event_id: &str) -> Result<WriteOutcome> {
        let response = self
            .http
            .delete(self.events_url(Some(event_id))?)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Failed to delete event: {}", event_id))?;

        finish_write(Write::Delete, response, &format!("delete event {}", event_id)).await
    }
}

impl EventStore for GoogleCalendar {
    async fn list_events(&self, owner_tag: &str) -> SyncResult<Vec<DestinationEvent>> {
        self.fetch_owned(owner_tag).await.map_err(provider_error)
    }

    async fn insert_event(&self, event: &NewEvent) -> SyncResult<WriteOutcome> {
        self.insert(event).await.map_err(provider_error)
    }

    async fn patch_event(&self, patch: &EventPatch) -> SyncResult<WriteOutcome> {
        self.patch(patch).await.map_err(provider_error)
    }

    async fn delete_event(&self, id: &str) -> SyncResult<WriteOutcome> {
        self.delete(id).await.map_err(provider_error)
    }
}

#[derive(Debug, Clone, Copy)]
enum Write {
    Insert,
    Patch,
    Delete,
}

/// How a write's HTTP status maps to an outcome; `None` is a failure.
///
/// An insert conflict means the event is already there, and a delete of an
/// event that is gone has nothing left to do.
fn write_outcome(write: Write, status: StatusCode) -> Option<WriteOutcome> {
    match (write, status) {
        (_, status) if status.is_success() => Some(WriteOutcome::Applied),
        (Write::Insert, StatusCode::CONFLICT) => Some(WriteOutcome::AlreadyConverged),
        (Write::Delete, StatusCode::NOT_FOUND | StatusCode::GONE) => {
            Some(WriteOutcome::AlreadyConverged)
        }
        _ => None,
    }
}

async fn finish_write(write: Write, response: Response, action: &str) -> Result<WriteOutcome> {
    match write_outcome(write, response.status()) {
        Some(outcome) => Ok(outcome),
        None => ensure_success(response, action)
            .await
            .map(|_| WriteOutcome::Applied),
    }
}

fn provider_error(err: anyhow::Error) -> SyncError {
    SyncError::Provider(format!("{:#}", err))
}

async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("Failed to {}: {} {}", action, status, body)
}

fn events_url(calendar_id: &str, event_id: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(API_BASE)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("Invalid API base URL"))?;
        segments.extend(["calendars", calendar_id, "events"]);
        if let Some(id) = event_id {
            segments.push(id);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_url_escapes_calendar_id() {
        let url = events_url("team#holidays@group.calendar.google.com", None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team%23holidays@group.calendar.google.com/events"
        );
    }

    #[test]
    fn test_successful_writes_are_applied() {
        for write in [Write::Insert, Write::Patch, Write::Delete] {
            assert_eq!(
                write_outcome(write, StatusCode::OK),
                Some(WriteOutcome::Applied)
            );
        }
        assert_eq!(
            write_outcome(Write::Delete, StatusCode::NO_CONTENT),
            Some(WriteOutcome::Applied)
        );
    }

    #[test]
    fn test_insert_conflict_is_converged() {
        assert_eq!(
            write_outcome(Write::Insert, StatusCode::CONFLICT),
            Some(WriteOutcome::AlreadyConverged)
        );
    }

    #[test]
    fn test_delete_of_missing_event_is_converged() {
        assert_eq!(
            write_outcome(Write::Delete, StatusCode::NOT_FOUND),
            Some(WriteOutcome::AlreadyConverged)
        );
        assert_eq!(
            write_outcome(Write::Delete, StatusCode::GONE),
            Some(WriteOutcome::AlreadyConverged)
        );
    }

    #[test]
    fn test_other_statuses_fail() {
        assert_eq!(write_outcome(Write::Patch, StatusCode::CONFLICT), None);
        assert_eq!(write_outcome(Write::Patch, StatusCode::NOT_FOUND), None);
        assert_eq!(write_outcome(Write::Insert, StatusCode::GONE), None);
        for write in [Write::Insert, Write::Patch, Write::Delete] {
            assert_eq!(write_outcome(write, StatusCode::INTERNAL_SERVER_ERROR), None);
            assert_eq!(write_outcome(write, StatusCode::FORBIDDEN), None);
        }
    }

    #[test]
    fn test_event_url_appends_id() {
        let url = events_url("primary", Some("abc123")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events/abc123"
        );
    }
}
