//! Configuration types for webcal-sync.

mod feed;
mod global;

pub use feed::FeedConfig;
pub use global::Config;
