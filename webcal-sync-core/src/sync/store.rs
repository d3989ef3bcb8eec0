//! The seam between the engine's plans and a concrete calendar backend.

use crate::error::SyncResult;
use crate::event::DestinationEvent;
use crate::reconcile::{EventPatch, NewEvent};

/// Result of a single write against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The store already held the requested state (e.g. the event existed
    /// or was already gone)
    AlreadyConverged,
}

/// A calendar backend that mirrored events are written to.
///
/// Implementations report backend failures as `SyncError::Provider`.
#[allow(async_fn_in_trait)]
pub trait EventStore {
    /// Events previously created for the feed tagged `owner_tag`, cancelled ones included
    async fn list_events(&self, owner_tag: &str) -> SyncResult<Vec<DestinationEvent>>;

    async fn insert_event(&self, event: &NewEvent) -> SyncResult<WriteOutcome>;

    async fn patch_event(&self, patch: &EventPatch) -> SyncResult<WriteOutcome>;

    async fn delete_event(&self, id: &str) -> SyncResult<WriteOutcome>;
}
