//! iCalendar feed handling: text repair, VEVENT extraction and recurrence expansion.

mod parse;
mod recurrence;

pub use parse::{parse_feed, parse_feed_at, repair};
