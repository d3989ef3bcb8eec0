//! Decide whether two calendar times count as "the same" for diffing.

use chrono::{DateTime, SubsecRound, Utc};

use crate::event::EventTime;

pub fn instants_equivalent(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.trunc_subsecs(0) == b.trunc_subsecs(0)
}

/// A date and an instant are never equivalent, even when the instant is that
/// date's midnight: the stored representation itself has to change.
pub fn equivalent(a: &EventTime, b: &EventTime) -> bool {
    match (a, b) {
        (EventTime::Date(x), EventTime::Date(y)) => x == y,
        (EventTime::DateTime(x), EventTime::DateTime(y)) => instants_equivalent(*x, *y),
        _ => false,
    }
}
