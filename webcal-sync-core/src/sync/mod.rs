//! Applying a reconciliation plan to a destination store.

mod apply;
mod store;

pub use apply::{ApplyStats, BatchStats, apply_plan};
pub use store::{EventStore, WriteOutcome};
