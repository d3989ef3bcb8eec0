//! Three-way diff between a feed and the events previously mirrored from it.

mod engine;
mod plan;

pub use engine::{reconcile, reconcile_at};
pub use plan::{EventPatch, FieldPatch, NewEvent, ReconciliationPlan};
